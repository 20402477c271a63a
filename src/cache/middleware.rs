//! The response-caching middleware.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use tracing::{debug, warn};

use super::{
    adapter::Adapter,
    config::CacheConfig,
    envelope::CachedResponse,
    error::ConfigError,
    key::{canonical_key, canonical_query},
};
use crate::{
    Request, Response, StatusCode,
    context::Context,
    middleware::{BoxResponse, Middleware, Next},
};

/// Response header naming how a response was produced: `HIT` or `MISS`.
pub const CACHE_STATUS_HEADER: &str = "X-Cache";

/// Serves `GET` responses from an [`Adapter`] for a fixed time-to-live.
///
/// # Per-request protocol
///
/// 1. Requests whose method is not `GET` (or unspecified) go straight to the
///    next layer and are never cached.
/// 2. The query is rewritten in canonical order. If it names the configured
///    release key, that parameter is removed and the entry for the cleaned
///    URL is released; the request then always goes downstream.
/// 3. Otherwise a fresh stored entry is answered with the configured hit
///    status (`302 Found` by default) and its body, after bumping its access
///    metadata. Stale or unreadable entries are released.
/// 4. On a miss the next layer runs. Responses below `400` are stored with
///    `expiration = now + ttl`; every response is returned to the caller as
///    produced.
///
/// Bodies are buffered whole, so very large responses cost their full size
/// in memory. Concurrent misses for the same key are not coalesced: each runs
/// the downstream handler and the last `set` wins.
///
/// # Examples
///
/// ```rust,no_run
/// use std::{sync::Arc, time::Duration};
/// use rttp_cache::{Response, StatusCode, context::Context, middleware::Pipeline};
/// use rttp_cache::cache::{CacheConfig, CacheMiddleware, MemoryAdapter};
///
/// let cache = CacheMiddleware::new(
///     CacheConfig::new()
///         .with_adapter(Arc::new(MemoryAdapter::new()))
///         .with_ttl(Duration::from_secs(10))
///         .with_release_key("refresh"),
/// )
/// .expect("valid cache config");
///
/// let pipeline = Pipeline::new(|_ctx: Context| async {
///     Response::new(StatusCode::Ok).body("expensive")
/// })
/// .layer(cache);
/// ```
#[derive(Clone)]
pub struct CacheMiddleware {
    adapter: Arc<dyn Adapter>,
    ttl: Duration,
    release_key: Option<Arc<str>>,
    hit_status: StatusCode,
}

impl CacheMiddleware {
    /// Validates `config` and builds the middleware.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingAdapter`] — no adapter was configured.
    /// - [`ConfigError::InvalidTtl`] — the TTL is zero, or so large that
    ///   `now + ttl` cannot be represented.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        let (adapter, ttl, release_key, hit_status) = config.into_parts();
        let adapter = adapter.ok_or(ConfigError::MissingAdapter)?;
        if ttl.is_zero() || SystemTime::now().checked_add(ttl).is_none() {
            return Err(ConfigError::InvalidTtl(ttl));
        }

        Ok(Self {
            adapter,
            ttl,
            release_key: release_key.map(Arc::from),
            hit_status,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn release_key(&self) -> Option<&str> {
        self.release_key.as_deref()
    }

    // Rewrites the query in canonical order, dropping the release parameter.
    // Returns whether a release was requested.
    fn prepare(&self, request: &mut Request) -> bool {
        let release_key = self.release_key.as_deref();
        let release = release_key.is_some_and(|k| request.has_query_param(k));

        let query = canonical_query(
            request
                .query_pairs()
                .iter()
                .filter(|(k, _)| !release || Some(k.as_str()) != release_key)
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        request.set_query(Some(query));
        release
    }

    async fn lookup(&self, key: u64) -> Option<CachedResponse> {
        let raw = self.adapter.get(key).await?;

        match CachedResponse::decode(&raw) {
            Ok(mut entry) => {
                let now = SystemTime::now();
                if entry.is_fresh(now) {
                    entry.touch(now);
                    self.adapter.set(key, entry.encode(), entry.expiration).await;
                    return Some(entry);
                }
                debug!(key, "cache entry stale");
            }
            Err(e) => warn!(key, error = %e, "discarding undecodable cache entry"),
        }

        self.adapter.release(key).await;
        None
    }

    async fn serve(&self, mut ctx: Context, next: Next) -> Response {
        if !ctx.request().method().is_cacheable() {
            return next.run(ctx).await;
        }

        let release = self.prepare(ctx.request_mut());
        let key = canonical_key(&ctx.request().url());

        if release {
            debug!(key, path = ctx.request().path(), "cache release requested");
            self.adapter.release(key).await;
        } else if let Some(entry) = self.lookup(key).await {
            debug!(key, frequency = entry.frequency, "cache hit");
            return Response::new(self.hit_status)
                .header(CACHE_STATUS_HEADER, "HIT")
                .body_bytes(entry.value.to_vec());
        }

        let mut response = next.run(ctx).await;
        let status = response.status();
        if status.is_error() {
            debug!(key, status = status.as_u16(), "downstream error not cached");
            return response;
        }

        let entry = CachedResponse::new(
            Bytes::copy_from_slice(response.payload()),
            SystemTime::now(),
            self.ttl,
        );
        self.adapter.set(key, entry.encode(), entry.expiration).await;
        debug!(key, status = status.as_u16(), "cache miss stored");

        response.set_header(CACHE_STATUS_HEADER, "MISS");
        response
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
        let this = self.clone();
        Box::pin(async move { this.serve(ctx, next).await })
    }
}
