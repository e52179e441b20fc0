//! Programmatic configuration builder for integration tests

use std::sync::Arc;

use fieldnote_client::{ApiClient, HttpClient};
use fieldnote_config::{AuthMode, Config, ConfigStore, PrimaryEncoding, UploadConfig, UploadStrategy};
use fieldnote_telemetry::Logger;
use fieldnote_upload::Uploader;
use secrecy::SecretString;

use super::mock_api::API_KEY;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder pointed at `base_url` with the mock's key, no
    /// polling and enrichment on
    pub fn new(base_url: &str) -> Self {
        Self {
            config: Config {
                api_base_url: base_url.to_owned(),
                api_key: SecretString::from(API_KEY),
                upload: UploadConfig {
                    poll_attempts: 0,
                    poll_interval: "10ms".to_owned(),
                    ..UploadConfig::default()
                },
                ..Config::default()
            },
        }
    }

    /// Set the auth mode
    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.config.auth_mode = mode;
        self
    }

    /// Replace the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.config.api_key = SecretString::from(key);
        self
    }

    /// Use the two-step mobile flow
    pub fn with_mobile_strategy(mut self) -> Self {
        self.config.upload.strategy = UploadStrategy::Mobile;
        self
    }

    /// Send JSON first instead of multipart
    pub fn with_json_primary(mut self) -> Self {
        self.config.upload.primary_encoding = PrimaryEncoding::Json;
        self
    }

    /// Poll session status up to `attempts` times
    pub fn with_polling(mut self, attempts: u32) -> Self {
        self.config.upload.poll_attempts = attempts;
        self
    }

    /// Set the structured log capacity
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.config.log.capacity = capacity;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }

    /// Build an API client over an in-memory store
    pub fn client(self) -> ApiClient {
        let config = self.build();
        let logger = Logger::new(config.log.capacity);
        let http = HttpClient::new(Arc::new(ConfigStore::in_memory(config)), logger).expect("http client");
        ApiClient::new(http)
    }

    /// Build an uploader over an in-memory store
    pub fn uploader(self) -> Uploader {
        Uploader::new(self.client())
    }
}
