//! Storage capability the cache middleware is built against.

use std::{sync::Arc, time::SystemTime};

use bytes::Bytes;

/// A shared key-value store for encoded [`CachedResponse`](super::CachedResponse)
/// envelopes.
///
/// Implementations are called concurrently from every in-flight request and
/// must synchronize access to the same key themselves. They own any capacity
/// limit and eviction policy; the envelope's `last_access` and `frequency`
/// fields are available to them for that purpose.
///
/// The methods are infallible: a backend that hits an I/O error should log it
/// and behave as a miss (for `get`) or a no-op (for `set`/`release`).
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the stored envelope for `key`, if any.
    async fn get(&self, key: u64) -> Option<Bytes>;

    /// Stores `response` under `key`. `expiration` is the envelope's own
    /// expiry, passed alongside so backends can schedule removal without
    /// decoding.
    async fn set(&self, key: u64, response: Bytes, expiration: SystemTime);

    /// Drops whatever is stored under `key`.
    async fn release(&self, key: u64);
}

#[async_trait::async_trait]
impl<A: Adapter + ?Sized> Adapter for Arc<A> {
    async fn get(&self, key: u64) -> Option<Bytes> {
        (**self).get(key).await
    }

    async fn set(&self, key: u64, response: Bytes, expiration: SystemTime) {
        (**self).set(key, response, expiration).await;
    }

    async fn release(&self, key: u64) {
        (**self).release(key).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::MemoryAdapter;

    #[tokio::test]
    async fn shared_handle_forwards_to_inner_store() {
        let inner = Arc::new(MemoryAdapter::new());
        let outer: Arc<dyn Adapter> = Arc::new(Arc::clone(&inner));
        let expiration = SystemTime::now() + Duration::from_secs(5);

        outer.set(7, Bytes::from_static(b"v"), expiration).await;
        assert!(inner.contains(7).await);
        assert_eq!(outer.get(7).await, Some(Bytes::from_static(b"v")));

        outer.release(7).await;
        assert!(inner.is_empty().await);
        assert_eq!(outer.get(7).await, None);
    }
}
