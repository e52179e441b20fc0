use fieldnote_config::ConfigError;

/// Client-specific result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the session API client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration is missing or invalid; the user must fix settings
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request never produced a response
    #[error("network error calling {url}: {source}")]
    Network {
        /// Redacted request URL
        url: String,
        /// Remediation suggestion, when the failure has a recognizable cause
        hint: Option<&'static str>,
        /// Transport error
        source: reqwest::Error,
    },

    /// Server returned a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Request could not be built from the given inputs
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// HTTP status for [`ClientError::Http`]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body excerpt for [`ClientError::Http`]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
