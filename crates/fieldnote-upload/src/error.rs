use fieldnote_client::ClientError;

pub type Result<T> = std::result::Result<T, UploadError>;

/// Terminal failures of an upload
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Entity resolution, the primary attempt or the fallback attempt failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The server accepted the upload but its response names no session
    #[error("upload response did not include a session id: {body}")]
    MissingSessionId {
        /// Truncated response body
        body: String,
    },

    /// The payload could not be converted between encodings
    #[error("invalid upload payload: {0}")]
    Payload(String),
}

/// Enrichment could not be triggered; reported, never fatal
#[derive(Debug, thiserror::Error)]
#[error("enrichment failed for session {session_id}: {source}")]
pub struct EnrichmentError {
    pub session_id: String,
    #[source]
    pub source: ClientError,
}
