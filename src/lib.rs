//! # rttp-cache
//!
//! HTTP response caching middleware for the rttp async toolkit.
//!
//! A [`CacheMiddleware`](cache::CacheMiddleware) wraps any handler in a
//! [`Pipeline`](middleware::Pipeline) and serves repeated `GET` requests from
//! a pluggable key-value [`Adapter`](cache::Adapter) until their TTL runs out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use rttp_cache::cache::{CacheConfig, CacheMiddleware, MemoryAdapter};
//! use rttp_cache::{Request, Response, StatusCode, context::Context, middleware::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = CacheMiddleware::new(
//!         CacheConfig::new()
//!             .with_adapter(Arc::new(MemoryAdapter::new()))
//!             .with_ttl(Duration::from_secs(60))
//!             .with_release_key("refresh"),
//!     )?;
//!
//!     let pipeline = Pipeline::new(|_ctx: Context| async {
//!         Response::new(StatusCode::Ok).body("Hello, World!")
//!     })
//!     .layer(cache);
//!
//!     let (request, _) = Request::parse(b"GET /?a=1 HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
//!     let response = pipeline.handle(request).await;
//!     println!("{}", response.status().as_u16());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
