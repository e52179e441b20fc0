use serde::{Deserialize, Serialize};

/// Upload policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Which endpoint family carries the upload
    #[serde(default)]
    pub strategy: UploadStrategy,
    /// Encoding tried first on the combined endpoint
    #[serde(default)]
    pub primary_encoding: PrimaryEncoding,
    /// Path variant used to trigger enrichment
    #[serde(default)]
    pub enrichment_route: EnrichmentRoute,
    /// Whether to trigger enrichment after a successful upload
    #[serde(default = "default_true")]
    pub enrich: bool,
    /// Maximum status polls after upload (0 disables polling)
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Delay between status polls, e.g. `"2s"` or `"500ms"`
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            strategy: UploadStrategy::default(),
            primary_encoding: PrimaryEncoding::default(),
            enrichment_route: EnrichmentRoute::default(),
            enrich: true,
            poll_attempts: default_poll_attempts(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Endpoint family used for uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadStrategy {
    /// One request to `/sessions/upload` carrying fields and media
    #[default]
    Combined,
    /// Create via `/mobile/sessions/create`, then attach via `upload-batch`
    Mobile,
}

/// First-choice body encoding for the combined endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrimaryEncoding {
    /// `multipart/form-data` with binary parts
    #[default]
    Multipart,
    /// JSON with base64-encoded media
    Json,
}

/// Enrichment trigger path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnrichmentRoute {
    /// `POST /sessions/{id}/enrich`
    #[default]
    Enrich,
    /// `POST /sessions/{id}/trigger-enrichment`
    TriggerEnrichment,
}

impl EnrichmentRoute {
    /// Path for the given session id
    pub fn path(self, session_id: &str) -> String {
        match self {
            Self::Enrich => format!("/sessions/{session_id}/enrich"),
            Self::TriggerEnrichment => format!("/sessions/{session_id}/trigger-enrichment"),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_poll_attempts() -> u32 {
    5
}

fn default_poll_interval() -> String {
    "2s".to_string()
}
