//! Middleware pipeline — composable before/after request handler logic.
//!
//! This module defines the core types for wrapping an endpoint handler in an
//! ordered middleware stack. Each middleware wraps the next layer, enabling
//! request inspection, short-circuit responses, and response decoration without
//! coupling handlers to infrastructure concerns such as caching.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`Handler`] / [`IntoHandler`] — the endpoint at the bottom of the chain.
//! - [`Pipeline`] — an endpoint plus the middleware layered over it.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{Request, Response, StatusCode, context::Context};

/// Boxed future returned by middleware and handlers.
pub type BoxResponse = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> BoxResponse + Send + Sync + 'static>;

/// Type-erased async endpoint that turns a [`Context`] into a [`Response`].
pub type Handler = Arc<dyn Fn(Context) -> BoxResponse + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically via the blanket impl
/// below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> BoxResponse;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxResponse {
        Box::pin((self)(ctx))
    }
}

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::{sync::Arc, time::Duration};
/// use rttp_cache::cache::{CacheConfig, CacheMiddleware, MemoryAdapter};
/// use rttp_cache::middleware::from_middleware;
///
/// let config = CacheConfig::new()
///     .with_adapter(Arc::new(MemoryAdapter::new()))
///     .with_ttl(Duration::from_secs(60));
/// let handler = from_middleware(Arc::new(CacheMiddleware::new(config).unwrap()));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is passed to each middleware's [`Middleware::handle`] implementation.
/// Calling [`Next::run`] advances the cursor by one position and invokes the next
/// middleware, or the endpoint once every middleware has run.
///
/// `Next` is consumed on each call to [`run`](Self::run), so it cannot be called
/// more than once per middleware invocation.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    endpoint: Option<Handler>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware stack.
    ///
    /// `endpoint` runs after the last middleware. Without one, an exhausted
    /// chain answers `500 Internal Server Error`.
    pub fn new(middlewares: Vec<MiddlewareHandler>, endpoint: Option<Handler>) -> Self {
        Self {
            middlewares,
            endpoint,
            index: 0,
        }
    }

    /// Creates a `Next` that goes straight to `handler`.
    pub fn endpoint(handler: impl IntoHandler) -> Self {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        Self::new(Vec::new(), Some(handler))
    }

    /// Invokes the next middleware in the chain and returns its response.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = Arc::clone(&self.middlewares[self.index]);
            self.index += 1;
            handler(ctx, self).await
        } else if let Some(endpoint) = self.endpoint {
            endpoint(ctx).await
        } else {
            Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may:
///
/// - **Pass through** — call `next.run(ctx).await` without modification.
/// - **Short-circuit** — return a [`Response`] directly without calling `next`.
/// - **Decorate** — call `next.run(ctx).await`, inspect the response, and return
///   a modified copy.
///
/// Implementations must be `Send + Sync` because middleware is shared across
/// Tokio tasks, and should not hold `&mut` references to shared state across
/// an `.await` point.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse;
}

/// An endpoint handler wrapped in an ordered middleware stack.
///
/// The first layer added is the outermost: it sees the request first and the
/// response last.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::{Response, StatusCode, context::Context, middleware::Pipeline};
///
/// let pipeline = Pipeline::new(|_ctx: Context| async { Response::new(StatusCode::Ok).body("hi") });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Vec<MiddlewareHandler>,
    endpoint: Handler,
}

impl Pipeline {
    /// Creates a pipeline with no middleware in front of `endpoint`.
    pub fn new(endpoint: impl IntoHandler) -> Self {
        Self {
            middlewares: Vec::new(),
            endpoint: Arc::new(move |ctx| endpoint.call(ctx)),
        }
    }

    /// Adds `middleware` inside every layer added before it.
    #[must_use]
    pub fn layer<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    /// Adds an already shared middleware.
    #[must_use]
    pub fn layer_shared<M>(mut self, middleware: Arc<M>) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(middleware));
        self
    }

    /// Runs `request` through every layer and the endpoint.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next::new(self.middlewares.clone(), Some(Arc::clone(&self.endpoint)));
        next.run(Context::new(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str) -> Request {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        Request::parse(raw.as_bytes()).unwrap().0
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
            let tag = self.0;
            Box::pin(async move {
                let mut resp = next.run(ctx).await;
                resp.add_header("X-Trace", tag);
                resp
            })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn handle(&self, _ctx: Context, _next: Next) -> BoxResponse {
            Box::pin(async { Response::new(StatusCode::Forbidden) })
        }
    }

    #[tokio::test]
    async fn endpoint_only() {
        let pipeline = Pipeline::new(|ctx: Context| async move {
            Response::new(StatusCode::Ok).body(ctx.request().path().to_owned())
        });
        let resp = pipeline.handle(request("/p")).await;
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.payload(), b"/p");
    }

    #[tokio::test]
    async fn layers_unwind_inner_first() {
        let pipeline = Pipeline::new(|_ctx: Context| async { Response::new(StatusCode::Ok) })
            .layer(Tag("outer"))
            .layer(Tag("inner"));
        let resp = pipeline.handle(request("/")).await;
        let trace: Vec<_> = resp.headers().get_all("x-trace").collect();
        assert_eq!(trace, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_endpoint() {
        let pipeline = Pipeline::new(|_ctx: Context| async { Response::new(StatusCode::Ok) })
            .layer(Deny);
        let resp = pipeline.handle(request("/")).await;
        assert_eq!(resp.status(), StatusCode::Forbidden);
    }

    #[tokio::test]
    async fn next_endpoint_runs_handler_directly() {
        let next = Next::endpoint(|_ctx: Context| async { Response::new(StatusCode::Accepted) });
        let resp = next.run(Context::new(request("/"))).await;
        assert_eq!(resp.status(), StatusCode::Accepted);
    }

    #[tokio::test]
    async fn exhausted_chain_without_endpoint_is_500() {
        let next = Next::new(Vec::new(), None);
        let resp = next.run(Context::new(request("/"))).await;
        assert_eq!(resp.status(), StatusCode::InternalServerError);
    }
}
