//! Cache middleware configuration.
//!
//! [`CacheConfig`] is assembled in code with builder methods. Hosts that keep
//! their settings in a file can deserialize a [`CacheSettings`] instead and
//! attach the adapter afterwards:
//!
//! ```
//! use std::sync::Arc;
//! use rttp_cache::cache::{CacheSettings, MemoryAdapter};
//!
//! let settings = CacheSettings::from_json(r#"{ "ttl_secs": 30, "release_key": "purge" }"#).unwrap();
//! let config = settings.into_config(Arc::new(MemoryAdapter::new())).unwrap();
//! assert_eq!(config.release_key(), Some("purge"));
//! ```

use std::{fmt, sync::Arc, time::Duration};

use serde::Deserialize;

use super::{adapter::Adapter, error::ConfigError};
use crate::StatusCode;

/// Everything a [`CacheMiddleware`](super::CacheMiddleware) needs.
///
/// Nothing is checked here; [`CacheMiddleware::new`](super::CacheMiddleware::new)
/// rejects a missing adapter and a zero or unrepresentably large TTL.
#[derive(Clone)]
pub struct CacheConfig {
    adapter: Option<Arc<dyn Adapter>>,
    ttl: Duration,
    release_key: Option<String>,
    hit_status: StatusCode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            ttl: Duration::ZERO,
            release_key: None,
            hit_status: StatusCode::Found,
        }
    }
}

impl CacheConfig {
    /// An empty configuration: no adapter, zero TTL, no release key, hits
    /// answered with `302 Found`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage backend.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Sets how long a stored response stays fresh.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the query parameter that forces a refresh. An empty name disables
    /// the mechanism.
    #[must_use]
    pub fn with_release_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.release_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Sets the status code used when a response is served from cache.
    #[must_use]
    pub fn with_hit_status(mut self, status: StatusCode) -> Self {
        self.hit_status = status;
        self
    }

    pub(crate) fn into_parts(self) -> (Option<Arc<dyn Adapter>>, Duration, Option<String>, StatusCode) {
        (self.adapter, self.ttl, self.release_key, self.hit_status)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn release_key(&self) -> Option<&str> {
        self.release_key.as_deref()
    }

    pub fn hit_status(&self) -> StatusCode {
        self.hit_status
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("adapter", &self.adapter.as_ref().map(|_| "<adapter>"))
            .field("ttl", &self.ttl)
            .field("release_key", &self.release_key)
            .field("hit_status", &self.hit_status)
            .finish()
    }
}

/// Serializable subset of [`CacheConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// TTL in seconds; fractions allowed.
    pub ttl_secs: f64,
    #[serde(default)]
    pub release_key: Option<String>,
    /// Numeric status for cache hits. Defaults to 302.
    #[serde(default)]
    pub hit_status: Option<u16>,
}

impl CacheSettings {
    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] on malformed JSON, a missing
    /// `ttl_secs`, or an unknown field.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Attaches `adapter` and converts into a [`CacheConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTtl`] when `ttl_secs` is negative, NaN, or
    /// too large, and [`ConfigError::UnsupportedHitStatus`] for status codes
    /// this crate does not model.
    pub fn into_config(self, adapter: Arc<dyn Adapter>) -> Result<CacheConfig, ConfigError> {
        let ttl = Duration::try_from_secs_f64(self.ttl_secs)
            .map_err(|_| ConfigError::InvalidTtl(Duration::ZERO))?;

        let mut config = CacheConfig::new().with_adapter(adapter).with_ttl(ttl);
        if let Some(key) = self.release_key {
            config = config.with_release_key(key);
        }
        if let Some(code) = self.hit_status {
            let status = StatusCode::from_u16(code).ok_or(ConfigError::UnsupportedHitStatus(code))?;
            config = config.with_hit_status(status);
        }
        Ok(config)
    }
}
