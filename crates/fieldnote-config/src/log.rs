use serde::{Deserialize, Serialize};

/// Structured log buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Maximum retained entries; the oldest is evicted first
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_capacity() -> usize {
    500
}
