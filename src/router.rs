//! Router module - Handles routing logic.
//!
//! This module provides the Router struct that matches incoming requests to
//! handlers. Paths match exactly. Each route carries an `AccessPolicy` that
//! is checked against the request context before its handler runs.

use crate::auth::context::RequestContext;
use crate::auth::rbac::{authorize, AccessPolicy};
use crate::errors::ApiError;
use crate::middleware::BoxFuture;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use hyper::{Body, Response};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Result type produced by route handlers.
pub type HandlerResult = Result<ApiResponse, ApiError>;

type Handler<S> = Arc<dyn Fn(ApiRequest, RequestContext, Arc<S>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Represents a route with method, path, access policy and handler.
pub struct Route<S> {
    method: String,
    path: String,
    policy: AccessPolicy,
    handler: Handler<S>,
}

impl<S: Send + Sync + 'static> Route<S> {
    /// Create a new public route.
    pub fn new<F, Fut>(method: &str, path: &str, handler: F) -> Self
    where
        F: Fn(ApiRequest, RequestContext, Arc<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler<S> = Arc::new(
            move |req: ApiRequest, ctx: RequestContext, state: Arc<S>| -> BoxFuture<'static, HandlerResult> {
                Box::pin(handler(req, ctx, state))
            },
        );
        Self {
            method: method.to_string(),
            path: path.to_string(),
            policy: AccessPolicy::Public,
            handler,
        }
    }

    /// Set the access requirement for this route.
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Router that holds all routes.
pub struct Router<S> {
    routes: HashMap<String, Vec<Route<S>>>,
}

impl<S: Send + Sync + 'static> Router<S> {
    /// Create a new router.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add a route to the router.
    pub fn add_route(&mut self, route: Route<S>) {
        self.routes.entry(route.method.clone()).or_default().push(route);
    }

    /// Handle an incoming request: find the route, enforce its policy, run the handler.
    pub async fn handle(&self, req: ApiRequest, ctx: &RequestContext, state: Arc<S>) -> Response<Body> {
        let route = match self.find(req.method().as_str(), req.uri().path()) {
            Some(route) => route,
            None => return ApiResponse::from(ApiError::NotFound).into(),
        };

        if let Err(denied) = authorize(&route.policy, ctx) {
            tracing::debug!(
                request_id = %ctx.request_id(),
                path = %route.path,
                policy = %route.policy,
                reason = %denied,
                "access denied"
            );
            return ApiResponse::from(ApiError::from(denied)).into();
        }

        match (route.handler)(req, ctx.clone(), state).await {
            Ok(resp) => resp.into(),
            Err(err) => ApiResponse::from(err).into(),
        }
    }

    fn find(&self, method: &str, path: &str) -> Option<&Route<S>> {
        self.routes
            .get(method)?
            .iter()
            .find(|route| self.matches(&route.path, path))
    }

    /// Simple path matching (exact match).
    fn matches(&self, route_path: &str, req_path: &str) -> bool {
        route_path == req_path
    }
}

impl<S: Send + Sync + 'static> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}
