//! In-process [`Adapter`] backed by a `HashMap`.
//!
//! No capacity limit and no eviction: entries live until they are released or
//! overwritten. Staleness is left to the middleware, so an expired entry is
//! still returned by `get`.

use std::{collections::HashMap, time::SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::trace;

use super::adapter::Adapter;

#[derive(Debug, Clone)]
struct Slot {
    response: Bytes,
    expiration: SystemTime,
}

/// Unbounded in-memory storage for cached responses.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rttp_cache::cache::{Adapter, MemoryAdapter};
///
/// let adapter: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
/// ```
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    slots: RwLock<HashMap<u64, Slot>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    pub async fn contains(&self, key: u64) -> bool {
        self.slots.read().await.contains_key(&key)
    }

    /// Expiration recorded by the last `set` for `key`.
    pub async fn expiration_of(&self, key: u64) -> Option<SystemTime> {
        self.slots.read().await.get(&key).map(|s| s.expiration)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn get(&self, key: u64) -> Option<Bytes> {
        self.slots.read().await.get(&key).map(|s| s.response.clone())
    }

    async fn set(&self, key: u64, response: Bytes, expiration: SystemTime) {
        trace!(key, len = response.len(), "memory adapter set");
        self.slots.write().await.insert(
            key,
            Slot {
                response,
                expiration,
            },
        );
    }

    async fn release(&self, key: u64) {
        if self.slots.write().await.remove(&key).is_some() {
            trace!(key, "memory adapter released entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn set_get_release() {
        let adapter = MemoryAdapter::new();
        let exp = SystemTime::now() + Duration::from_secs(1);

        assert!(adapter.get(7).await.is_none());
        adapter.set(7, Bytes::from_static(b"v"), exp).await;
        assert_eq!(adapter.get(7).await, Some(Bytes::from_static(b"v")));
        assert_eq!(adapter.expiration_of(7).await, Some(exp));
        assert_eq!(adapter.len().await, 1);

        adapter.release(7).await;
        assert!(!adapter.contains(7).await);
        assert!(adapter.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entries_are_still_returned() {
        let adapter = MemoryAdapter::new();
        let past = SystemTime::now() - Duration::from_secs(60);
        adapter.set(1, Bytes::from_static(b"old"), past).await;
        assert!(adapter.get(1).await.is_some());
    }

    #[tokio::test]
    async fn release_of_missing_key_is_noop() {
        let adapter = MemoryAdapter::new();
        adapter.release(42).await;
        assert!(adapter.is_empty().await);
    }

    #[tokio::test]
    async fn last_set_wins() {
        let adapter = MemoryAdapter::new();
        let exp = SystemTime::now();
        adapter.set(3, Bytes::from_static(b"a"), exp).await;
        adapter.set(3, Bytes::from_static(b"b"), exp).await;
        assert_eq!(adapter.get(3).await, Some(Bytes::from_static(b"b")));
    }
}
