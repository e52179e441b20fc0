use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;

use crate::error::Result;
use crate::{AuthMode, Config, EnrichmentRoute, PrimaryEncoding, UploadStrategy};

/// Partial configuration change; `None` fields keep their current value
#[derive(Debug, Default, Clone)]
pub struct ConfigUpdate {
    pub api_base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub auth_mode: Option<AuthMode>,
    pub auth_header: Option<String>,
    pub auth_query_param: Option<String>,
    pub strategy: Option<UploadStrategy>,
    pub primary_encoding: Option<PrimaryEncoding>,
    pub enrichment_route: Option<EnrichmentRoute>,
    pub enrich: Option<bool>,
    pub poll_attempts: Option<u32>,
    pub poll_interval: Option<String>,
    pub log_capacity: Option<usize>,
}

impl ConfigUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.api_base_url.is_none()
            && self.api_key.is_none()
            && self.auth_mode.is_none()
            && self.auth_header.is_none()
            && self.auth_query_param.is_none()
            && self.strategy.is_none()
            && self.primary_encoding.is_none()
            && self.enrichment_route.is_none()
            && self.enrich.is_none()
            && self.poll_attempts.is_none()
            && self.poll_interval.is_none()
            && self.log_capacity.is_none()
    }

    fn apply(self, config: &mut Config) {
        if let Some(v) = self.api_base_url {
            config.api_base_url = v;
        }
        if let Some(v) = self.api_key {
            config.api_key = v;
        }
        if let Some(v) = self.auth_mode {
            config.auth_mode = v;
        }
        if let Some(v) = self.auth_header {
            config.auth_header = v;
        }
        if let Some(v) = self.auth_query_param {
            config.auth_query_param = v;
        }
        if let Some(v) = self.strategy {
            config.upload.strategy = v;
        }
        if let Some(v) = self.primary_encoding {
            config.upload.primary_encoding = v;
        }
        if let Some(v) = self.enrichment_route {
            config.upload.enrichment_route = v;
        }
        if let Some(v) = self.enrich {
            config.upload.enrich = v;
        }
        if let Some(v) = self.poll_attempts {
            config.upload.poll_attempts = v;
        }
        if let Some(v) = self.poll_interval {
            config.upload.poll_interval = v;
        }
        if let Some(v) = self.log_capacity {
            config.log.capacity = v;
        }
    }
}

/// Process-wide configuration holder
///
/// Readers get an `Arc<Config>` snapshot, so a concurrent update replaces
/// the value without disturbing requests already in flight.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Arc<Config>>>,
}

impl ConfigStore {
    /// Store backed by a TOML file, loaded on first access
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            current: RwLock::new(None),
        }
    }

    /// Store that never touches disk
    pub fn in_memory(config: Config) -> Self {
        Self {
            path: None,
            current: RwLock::new(Some(Arc::new(config))),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current configuration, reading the backing file if not yet loaded
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read or parsed
    pub fn get(&self) -> Result<Arc<Config>> {
        if let Some(config) = self.current.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(config));
        }

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = slot.as_ref() {
            return Ok(Arc::clone(config));
        }

        let loaded = Arc::new(match &self.path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        });
        *slot = Some(Arc::clone(&loaded));

        Ok(loaded)
    }

    /// Merge `update` into the current configuration and persist the result
    ///
    /// # Errors
    ///
    /// Returns an error if the current value cannot be loaded or the merged
    /// value cannot be written
    pub fn update(&self, update: ConfigUpdate) -> Result<Arc<Config>> {
        let mut merged = (*self.get()?).clone();
        update.apply(&mut merged);

        if let Some(path) = &self.path {
            merged.save(path)?;
        }

        let merged = Arc::new(merged);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&merged));

        tracing::info!(
            path = ?self.path,
            base_url = %merged.api_base_url,
            auth_mode = %merged.auth_mode,
            "configuration saved"
        );

        Ok(merged)
    }
}
