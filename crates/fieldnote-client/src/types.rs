use jiff::civil::Date;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

// -- Response normalization --

/// A response body before its payload is extracted
///
/// The API sometimes returns the payload directly and sometimes under a
/// `data` key; both are accepted and unwrapped here so the rest of the
/// client sees one shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Payload returned as-is
    Bare(Value),
    /// Payload found under `data`
    Wrapped(Value),
}

impl Envelope {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_) | Value::Array(_))) => {
                Self::Wrapped(map.remove("data").unwrap_or(Value::Null))
            }
            other => Self::Bare(other),
        }
    }

    pub fn into_inner(self) -> Value {
        match self {
            Self::Bare(value) | Self::Wrapped(value) => value,
        }
    }
}

/// Unwrap and deserialize a single object
pub(crate) fn decode_one<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(Envelope::classify(value).into_inner())
        .map_err(|e| ClientError::Parse(format!("unexpected {what} shape: {e}")))
}

/// Unwrap and deserialize a list; `null` is an empty list
pub(crate) fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>> {
    match Envelope::classify(value).into_inner() {
        Value::Null => Ok(Vec::new()),
        inner => serde_json::from_value(inner).map_err(|e| ClientError::Parse(format!("unexpected {what} list: {e}"))),
    }
}

/// Find the session id in an upload or create response
///
/// Checked in order: a bare id, then `id`, `session_id` and `sessionId` at
/// the top level, then the same keys under a `data` or `session` wrapper.
pub fn extract_session_id(value: &Value) -> Option<String> {
    const KEYS: [&str; 3] = ["id", "session_id", "sessionId"];
    const WRAPPERS: [&str; 2] = ["data", "session"];

    if let Some(id) = id_string(value) {
        return Some(id);
    }

    let object = value.as_object()?;

    KEYS.iter()
        .find_map(|key| object.get(*key).and_then(id_string))
        .or_else(|| {
            WRAPPERS.iter().find_map(|wrapper| {
                let inner = object.get(*wrapper)?;
                id_string(inner).or_else(|| KEYS.iter().find_map(|key| inner.get(*key).and_then(id_string)))
            })
        })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ids arrive as strings or integers depending on the backend
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_string(&value).ok_or_else(|| serde::de::Error::custom(format!("expected string or integer id, got {value}")))
}

fn deserialize_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_string))
}

// -- Conferences --

/// Conference as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Conference {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// `POST /conferences` body
#[derive(Debug, Clone, Serialize)]
pub struct NewConference {
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
}

// -- Vendors --

/// Vendor (exhibitor) as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Vendor {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "conferenceId", deserialize_with = "deserialize_opt_id")]
    pub conference_id: Option<String>,
    /// Sessions embedded in the vendor detail view
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<Value>,
}

/// `POST /vendors` body
#[derive(Debug, Clone, Serialize)]
pub struct NewVendor {
    pub name: String,
    pub conference_id: String,
}

// -- Sessions --

/// Session detail as returned by `GET /sessions/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Session {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "conferenceId", deserialize_with = "deserialize_opt_id")]
    pub conference_id: Option<String>,
    #[serde(default, alias = "vendorId", deserialize_with = "deserialize_opt_id")]
    pub vendor_id: Option<String>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_remote(self.status.as_deref())
    }
}

/// Processing state of a remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Created,
    Processing,
    Other(String),
    /// Status could not be determined
    Unknown,
}

impl SessionStatus {
    pub fn from_remote(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            None | Some("") => Self::Unknown,
            Some(s) if s.eq_ignore_ascii_case("created") => Self::Created,
            Some(s) if s.eq_ignore_ascii_case("processing") => Self::Processing,
            Some(s) => Self::Other(s.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Other(s) => s,
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
