//! Response caching — a TTL cache in front of any handler.
//!
//! [`CacheMiddleware`] derives a canonical key from each `GET` request URL,
//! asks an [`Adapter`] for a stored [`CachedResponse`], and either answers
//! from it or runs the rest of the pipeline and stores what comes back.
//!
//! Storage is pluggable: anything implementing [`Adapter`] works.
//! [`MemoryAdapter`] is an unbounded in-process store for tests and small
//! deployments; eviction policies belong in other adapters.
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use rttp_cache::cache::{CacheConfig, CacheMiddleware, MemoryAdapter};
//!
//! let cache = CacheMiddleware::new(
//!     CacheConfig::new()
//!         .with_adapter(Arc::new(MemoryAdapter::new()))
//!         .with_ttl(Duration::from_secs(30)),
//! )?;
//! # Ok::<(), rttp_cache::cache::ConfigError>(())
//! ```

pub mod adapter;
pub mod config;
pub mod envelope;
pub mod error;
pub mod key;
pub mod memory;
pub mod middleware;

pub use adapter::Adapter;
pub use config::{CacheConfig, CacheSettings};
pub use envelope::CachedResponse;
pub use error::{ConfigError, EnvelopeError};
pub use key::canonical_key;
pub use memory::MemoryAdapter;
pub use middleware::{CACHE_STATUS_HEADER, CacheMiddleware};
