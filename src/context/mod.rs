//! Per-request context handed down the middleware pipeline.
//!
//! A [`Context`] owns the [`Request`] for the duration of one pass through the
//! pipeline. Middleware may rewrite the request in place (the cache layer
//! strips its release parameter this way) before passing the context on.

use crate::Request;

/// Per-request state passed from middleware to middleware.
#[derive(Debug)]
pub struct Context {
    request: Request,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }
}

impl From<Request> for Context {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}
