//! Error types for the cache layer.
//!
//! Only [`ConfigError`] ever reaches a caller, and only while a
//! [`CacheMiddleware`](super::CacheMiddleware) is being built. Everything that
//! can go wrong while serving a request degrades to a cache miss.

use std::time::Duration;

use thiserror::Error;

/// Invalid cache configuration, reported at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cache middleware requires a storage adapter")]
    MissingAdapter,

    #[error("cache middleware requires a positive ttl, got {0:?}")]
    InvalidTtl(Duration),

    #[error("unsupported cache-hit status code: {0}")]
    UnsupportedHitStatus(u16),

    #[error("invalid cache settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),
}

/// A stored envelope that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("not a cached response envelope")]
    BadMagic,

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("envelope timestamp out of range")]
    InvalidTimestamp,

    #[error("{0} unexpected bytes after envelope")]
    TrailingBytes(usize),
}
