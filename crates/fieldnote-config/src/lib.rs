#![allow(clippy::must_use_candidate)]

//! Configuration for fieldnote
//!
//! Holds the API endpoint, credential and upload policy. A [`ConfigStore`]
//! owns the process-wide value and persists it as TOML.

pub mod auth;
pub mod error;
mod loader;
pub mod log;
mod store;
pub mod upload;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

pub use auth::AuthMode;
pub use error::ConfigError;
pub use log::LogConfig;
pub use store::{ConfigStore, ConfigUpdate};
pub use upload::{EnrichmentRoute, PrimaryEncoding, UploadConfig, UploadStrategy};

/// Top-level fieldnote configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the conference session API
    #[serde(default)]
    pub api_base_url: String,
    /// API credential, applied according to `auth_mode`
    #[serde(default = "empty_secret", serialize_with = "serialize_secret")]
    pub api_key: SecretString,
    /// How the credential is attached to outbound requests
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Header carrying the key when `auth_mode = "header"`
    #[serde(default = "auth::default_header")]
    pub auth_header: String,
    /// Query parameter carrying the key when `auth_mode = "query"`
    #[serde(default = "auth::default_query_param")]
    pub auth_query_param: String,
    /// Upload policy
    #[serde(default)]
    pub upload: UploadConfig,
    /// Structured log buffer settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: empty_secret(),
            auth_mode: AuthMode::default(),
            auth_header: auth::default_header(),
            auth_query_param: auth::default_query_param(),
            upload: UploadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

/// The key is written back in clear text so the file round-trips
fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
