//! Middleware module - Support for before/after request processing.
//!
//! Middleware runs around the router for every request. Each hook receives the
//! request's `RequestContext`, which is how authentication state travels from
//! the authenticator to the authorization gate and the handler.

use crate::auth::context::RequestContext;
use hyper::{Body, Request, Response};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by middleware hooks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type alias for middleware results
pub type MiddlewareResult<T> = Result<T, Response<Body>>;

/// Trait for middleware.
pub trait Middleware: Send + Sync {
    /// Process before the request is handled.
    /// Return Ok(req) to continue, or Err(response) to short-circuit.
    fn before<'a>(
        &'a self,
        req: Request<Body>,
        _ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Request<Body>>> {
        Box::pin(async move { Ok(req) })
    }

    /// Process after the response is generated.
    fn after<'a>(&'a self, resp: Response<Body>, _ctx: &'a RequestContext) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move { resp })
    }
}

/// Stack of middleware.
#[derive(Default)]
pub struct MiddlewareStack {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareStack {
    /// Create a new middleware stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the stack.
    pub fn add(&mut self, middleware: Box<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Apply before middleware in registration order.
    pub async fn before(
        &self,
        mut req: Request<Body>,
        ctx: &mut RequestContext,
    ) -> MiddlewareResult<Request<Body>> {
        for middleware in &self.middlewares {
            req = middleware.before(req, ctx).await?;
        }
        Ok(req)
    }

    /// Apply after middleware in registration order.
    pub async fn after(&self, mut resp: Response<Body>, ctx: &RequestContext) -> Response<Body> {
        for middleware in &self.middlewares {
            resp = middleware.after(resp, ctx).await;
        }
        resp
    }
}

/// Logs every request and its outcome through `tracing`.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before<'a>(
        &'a self,
        req: Request<Body>,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Request<Body>>> {
        Box::pin(async move {
            tracing::info!(
                request_id = %ctx.request_id(),
                method = %req.method(),
                path = %req.uri().path(),
                "request received"
            );
            Ok(req)
        })
    }

    fn after<'a>(&'a self, resp: Response<Body>, ctx: &'a RequestContext) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            tracing::info!(
                request_id = %ctx.request_id(),
                status = resp.status().as_u16(),
                principal = ctx.principal().map(|p| p.username.as_str()).unwrap_or("-"),
                latency_ms = ctx.started_at().elapsed().as_millis() as u64,
                "request completed"
            );
            resp
        })
    }
}
