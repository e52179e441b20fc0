//! Upload body construction and conversion between encodings
//!
//! Multipart layout: one text part per scalar field, a file part `audio`
//! and repeated file parts `images`. JSON layout: the same scalar fields,
//! with each file as `{ filename, content_type, data }` (standard base64).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use fieldnote_client::{FilePart, FormPart, MultipartPayload, RequestBody};
use serde_json::{Map, Value, json};

use crate::error::{Result, UploadError};
use crate::media::{AudioClip, ImageFile, guess_content_type};

pub const CONFERENCE_ID: &str = "conference_id";
pub const VENDOR_ID: &str = "vendor_id";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
/// The one field carrying the user's free text
pub const USER_NOTES: &str = "user_notes";
/// Rejected by the backend; never sent
pub const FORBIDDEN_NOTES: &str = "notes";
pub const AUDIO: &str = "audio";
pub const IMAGES: &str = "images";

/// Body encoding of an upload attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Multipart,
    Json,
}

impl Encoding {
    pub const fn alternate(self) -> Self {
        match self {
            Self::Multipart => Self::Json,
            Self::Json => Self::Multipart,
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Multipart => "multipart",
            Self::Json => "json",
        })
    }
}

/// Scalar fields shared by every upload variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFields {
    pub conference_id: String,
    pub vendor_id: String,
    /// ISO-8601
    pub start_time: String,
    /// ISO-8601
    pub end_time: String,
    pub user_notes: String,
}

impl UploadFields {
    /// Text fields in wire order; blank notes go out as an empty string
    fn pairs(&self) -> [(&'static str, &str); 5] {
        let notes = if self.user_notes.trim().is_empty() {
            ""
        } else {
            self.user_notes.as_str()
        };

        [
            (CONFERENCE_ID, self.conference_id.as_str()),
            (VENDOR_ID, self.vendor_id.as_str()),
            (START_TIME, self.start_time.as_str()),
            (END_TIME, self.end_time.as_str()),
            (USER_NOTES, notes),
        ]
    }

    /// Fields only, as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.pairs()
                .into_iter()
                .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
                .collect(),
        )
    }
}

/// A fully built upload body in one encoding
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    Multipart(MultipartPayload),
    Json(Map<String, Value>),
}

impl UploadPayload {
    /// Multipart body for the given fields and media
    pub fn build(fields: &UploadFields, audio: Option<&AudioClip>, images: &[ImageFile]) -> Self {
        let mut payload = MultipartPayload::new();

        for (name, value) in fields.pairs() {
            payload = payload.text(name, value);
        }

        if let Some(clip) = audio {
            payload = payload.file(FilePart {
                name: AUDIO.to_owned(),
                filename: clip.filename.clone(),
                content_type: clip.effective_content_type(),
                bytes: clip.bytes.clone(),
            });
        }

        for image in images {
            payload = payload.file(FilePart {
                name: IMAGES.to_owned(),
                filename: image.filename.clone(),
                content_type: image.effective_content_type(),
                bytes: image.bytes.clone(),
            });
        }

        Self::Multipart(payload)
    }

    pub const fn encoding(&self) -> Encoding {
        match self {
            Self::Multipart(_) => Encoding::Multipart,
            Self::Json(_) => Encoding::Json,
        }
    }

    /// Re-encode into `encoding`
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON file entry carries invalid base64
    pub fn into_encoding(self, encoding: Encoding) -> Result<Self> {
        match (self, encoding) {
            (Self::Multipart(m), Encoding::Json) => Ok(Self::Json(multipart_to_json(&m))),
            (Self::Json(j), Encoding::Multipart) => Ok(Self::Multipart(json_to_multipart(&j)?)),
            (same, _) => Ok(same),
        }
    }

    /// Remove any field named `notes`; returns whether one was present
    pub fn scrub_forbidden(&mut self) -> bool {
        match self {
            Self::Multipart(m) => m.remove(FORBIDDEN_NOTES) > 0,
            Self::Json(j) => j.remove(FORBIDDEN_NOTES).is_some(),
        }
    }

    /// Text value of a scalar field, in either encoding
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Multipart(m) => m.text_value(name),
            Self::Json(j) => j.get(name).and_then(Value::as_str),
        }
    }

    /// Scalar fields only, as a JSON object
    pub fn text_fields(&self) -> Map<String, Value> {
        match self {
            Self::Multipart(m) => m
                .parts()
                .iter()
                .filter_map(|part| match part {
                    FormPart::Text { name, value } => Some((name.clone(), Value::String(value.clone()))),
                    FormPart::File(_) => None,
                })
                .collect(),
            Self::Json(j) => j
                .iter()
                .filter(|(_, v)| v.is_string() || v.is_number() || v.is_boolean())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn has_files(&self) -> bool {
        match self {
            Self::Multipart(m) => m.files().next().is_some(),
            Self::Json(j) => j.values().any(|v| {
                is_file_entry(v) || v.as_array().is_some_and(|items| !items.is_empty() && items.iter().all(is_file_entry))
            }),
        }
    }

    /// File parts only, for attach endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON file entry carries invalid base64
    pub fn files(&self) -> Result<MultipartPayload> {
        match self {
            Self::Multipart(m) => Ok(m.files_only()),
            Self::Json(j) => Ok(json_to_multipart(j)?.files_only()),
        }
    }

    pub fn into_body(self) -> RequestBody {
        match self {
            Self::Multipart(m) => RequestBody::Multipart(m),
            Self::Json(j) => RequestBody::Json(Value::Object(j)),
        }
    }
}

/// JSON equivalent of a multipart body
///
/// Text parts become string fields. File parts become
/// `{ filename, content_type, data }` objects; `images`, and any other name
/// used by more than one file, becomes an array.
pub fn multipart_to_json(payload: &MultipartPayload) -> Map<String, Value> {
    let mut out = Map::new();

    for part in payload.parts() {
        match part {
            FormPart::Text { name, value } => {
                out.insert(name.clone(), Value::String(value.clone()));
            }
            FormPart::File(file) => {
                let entry = json!({
                    "filename": file.filename,
                    "content_type": file.content_type,
                    "data": STANDARD.encode(&file.bytes),
                });

                let repeated = file.name == IMAGES || payload.files().filter(|f| f.name == file.name).count() > 1;
                if repeated {
                    match out.entry(file.name.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                        Value::Array(items) => items.push(entry),
                        other => *other = Value::Array(vec![entry]),
                    }
                } else {
                    out.insert(file.name.clone(), entry);
                }
            }
        }
    }

    out
}

/// Multipart equivalent of a JSON upload body
///
/// Inverse of [`multipart_to_json`]. Entries missing a filename or type get
/// them inferred from the field name and filename.
///
/// # Errors
///
/// Returns an error if a file entry's `data` is not valid base64
pub fn json_to_multipart(body: &Map<String, Value>) -> Result<MultipartPayload> {
    let mut payload = MultipartPayload::new();

    for (name, value) in body {
        match value {
            Value::Null => {}
            Value::String(s) => payload.push(text(name, s.clone())),
            Value::Bool(_) | Value::Number(_) => payload.push(text(name, value.to_string())),
            Value::Object(entry) if entry.contains_key("data") => {
                payload.push(FormPart::File(decode_file(name, entry, 0)?));
            }
            Value::Array(items) if items.iter().all(is_file_entry) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(entry) = item {
                        payload.push(FormPart::File(decode_file(name, entry, index)?));
                    }
                }
            }
            other => payload.push(text(name, other.to_string())),
        }
    }

    Ok(payload)
}

fn text(name: &str, value: String) -> FormPart {
    FormPart::Text {
        name: name.to_owned(),
        value,
    }
}

fn is_file_entry(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.contains_key("data"))
}

fn decode_file(name: &str, entry: &Map<String, Value>, index: usize) -> Result<FilePart> {
    let data = entry.get("data").and_then(Value::as_str).unwrap_or_default();
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| UploadError::Payload(format!("field '{name}' is not valid base64: {e}")))?;

    let filename = entry
        .get("filename")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty())
        .map_or_else(|| default_filename(name, index), str::to_owned);

    let content_type = entry
        .get("content_type")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map_or_else(|| guess_content_type(&filename), str::to_owned);

    Ok(FilePart {
        name: name.to_owned(),
        filename,
        content_type,
        bytes: Bytes::from(bytes),
    })
}

fn default_filename(name: &str, index: usize) -> String {
    match name {
        AUDIO => "recording.m4a".to_owned(),
        IMAGES => format!("image-{}.jpg", index + 1),
        other => format!("{other}-{}", index + 1),
    }
}
