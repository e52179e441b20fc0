use bytes::Bytes;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Longest body sample kept in log entries and error excerpts
pub const BODY_SAMPLE_LIMIT: usize = 2000;

/// Outbound request body
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Sent as `multipart/form-data`; the transport supplies the boundary
    Multipart(MultipartPayload),
}

impl RequestBody {
    pub(crate) fn summary(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(Value::String(truncate(&value.to_string(), BODY_SAMPLE_LIMIT))),
            Self::Multipart(payload) => Some(payload.summary()),
        }
    }
}

/// Inspectable multipart body
///
/// Kept as plain data rather than a `reqwest` form so a failed attempt can be
/// re-encoded for a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    parts: Vec<FormPart>,
}

/// One field of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File(FilePart),
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } => name,
            Self::File(file) => &file.name,
        }
    }
}

/// Binary multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub name: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file field
    #[must_use]
    pub fn file(mut self, file: FilePart) -> Self {
        self.parts.push(FormPart::File(file));
        self
    }

    pub fn push(&mut self, part: FormPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// First text value under `name`
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// File parts, in order
    pub fn files(&self) -> impl Iterator<Item = &FilePart> {
        self.parts.iter().filter_map(|part| match part {
            FormPart::File(file) => Some(file),
            FormPart::Text { .. } => None,
        })
    }

    /// Remove every field named `name`, returning how many were dropped
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.parts.len();
        self.parts.retain(|part| part.name() != name);
        before - self.parts.len()
    }

    /// Only the file parts, for endpoints that attach media to a session
    #[must_use]
    pub fn files_only(&self) -> Self {
        Self {
            parts: self
                .parts
                .iter()
                .filter(|part| matches!(part, FormPart::File(_)))
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn into_form(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();

        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File(file) => {
                    let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
                        .file_name(file.filename)
                        .mime_str(&file.content_type)
                        .map_err(|e| ClientError::InvalidRequest(format!("invalid content type: {e}")))?;
                    form.part(file.name, part)
                }
            };
        }

        Ok(form)
    }

    /// Field listing for the request log; binary parts are summarized
    pub(crate) fn summary(&self) -> Value {
        Value::Array(
            self.parts
                .iter()
                .map(|part| match part {
                    FormPart::Text { name, value } => {
                        serde_json::json!({ "name": name, "value": truncate(value, BODY_SAMPLE_LIMIT) })
                    }
                    FormPart::File(file) => serde_json::json!({
                        "name": file.name,
                        "filename": file.filename,
                        "value": blob_summary(&file.content_type, file.bytes.len()),
                    }),
                })
                .collect(),
        )
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Blob { content_type: String, bytes: Bytes },
}

impl ResponseBody {
    /// Classify raw bytes by their declared content type
    ///
    /// JSON types are parsed (an empty body is `null`); text types are
    /// parsed as JSON when possible; everything else stays binary.
    pub(crate) fn decode(content_type: Option<&str>, bytes: Bytes) -> Result<Self> {
        let lowered = content_type.map(str::to_ascii_lowercase);

        match lowered.as_deref() {
            Some(ct) if ct.contains("json") => {
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Self::Json(Value::Null));
                }
                serde_json::from_slice(&bytes)
                    .map(Self::Json)
                    .map_err(|e| ClientError::Parse(format!("invalid JSON body: {e}")))
            }
            Some(ct) if ct.starts_with("text/") => Ok(Self::from_text(bytes)),
            None if bytes.is_empty() => Ok(Self::Json(Value::Null)),
            None => Ok(Self::from_text(bytes)),
            Some(_) => Ok(Self::Blob {
                content_type: content_type.unwrap_or_default().to_owned(),
                bytes,
            }),
        }
    }

    fn from_text(bytes: Bytes) -> Self {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        serde_json::from_str(&text).map_or(Self::Text(text), Self::Json)
    }

    /// Truncated rendering for logs
    pub fn sample(&self) -> String {
        match self {
            Self::Json(value) => truncate(&value.to_string(), BODY_SAMPLE_LIMIT),
            Self::Text(text) => truncate(text, BODY_SAMPLE_LIMIT),
            Self::Blob { content_type, bytes } => blob_summary(content_type, bytes.len()),
        }
    }

    /// JSON payload, treating text as a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error for binary bodies
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => Ok(Value::String(text)),
            Self::Blob { content_type, bytes } => Err(ClientError::Parse(format!(
                "expected JSON, got {}",
                blob_summary(&content_type, bytes.len())
            ))),
        }
    }
}

/// `[blob <type> <size> bytes]`
pub fn blob_summary(content_type: &str, size: usize) -> String {
    let content_type = if content_type.is_empty() { "unknown" } else { content_type };
    format!("[blob {content_type} {size} bytes]")
}

/// Cut `text` to at most `limit` characters, marking the cut
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}
