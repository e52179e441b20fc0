use std::path::Path;
use std::time::Duration;

use secrecy::ExposeSecret;
use url::Url;

use crate::Config;
use crate::error::{ConfigError, Result};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error and yields the defaults, so a fresh
    /// install can be configured through [`crate::ConfigStore::update`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::parse(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Write the configuration to a TOML file, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate that a request can be built from this configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] or [`ConfigError::MissingApiKey`]
    /// when either is blank, or an error describing a malformed value
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        self.base_url()?;

        Ok(())
    }

    /// Parsed base URL with any trailing slash removed from the path
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank or not absolute http(s)
    pub fn base_url(&self) -> Result<Url> {
        let raw = self.api_base_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: raw.to_owned(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let trimmed = url.path().trim_end_matches('/').to_owned();
        url.set_path(&trimmed);

        Ok(url)
    }

    /// Delay between status polls
    ///
    /// # Errors
    ///
    /// Returns an error if `upload.poll_interval` is not a duration string
    pub fn poll_interval(&self) -> Result<Duration> {
        duration_str::parse(&self.upload.poll_interval).map_err(|e| ConfigError::InvalidPollInterval {
            value: self.upload.poll_interval.clone(),
            reason: e.to_string(),
        })
    }
}
