//! Authentication middleware.
//!
//! `AuthMiddleware` runs once per request in the server's global stack. It
//! reads a bearer token, verifies it and binds the matching principal to the
//! request context. It never rejects a request itself: a missing or invalid
//! token leaves the request anonymous and the route's access policy decides.

use crate::auth::context::{AuthFault, RequestContext};
use crate::auth::jwt::{TokenCodec, TokenError};
use crate::database::{CredentialStore, StoreError};
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult};
use chrono::{DateTime, Utc};
use hyper::{header::AUTHORIZATION, Body, HeaderMap, Request};
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// Request authenticator for bearer tokens
pub struct AuthMiddleware {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
}

impl AuthMiddleware {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    /// Extract the bearer token from request headers.
    ///
    /// A missing header, another scheme, a non-UTF-8 value or an empty token
    /// all count as no token.
    fn extract_token(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .filter(|token| !token.is_empty())
    }

    /// Authenticate the request described by `headers` at instant `now`.
    ///
    /// The first principal bound to a context wins, so once one is bound the
    /// token is not even verified.
    pub async fn authenticate(&self, headers: &HeaderMap, ctx: &mut RequestContext, now: DateTime<Utc>) {
        if ctx.is_authenticated() {
            return;
        }

        let token = match Self::extract_token(headers) {
            Some(token) => token,
            None => return,
        };

        let verified = match self.codec.verify(token, now) {
            Ok(verified) => verified,
            Err(TokenError::Expired) => {
                tracing::debug!(request_id = %ctx.request_id(), class = "expired", "bearer token rejected");
                return;
            }
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id(), class = e.class(), "bearer token rejected");
                return;
            }
        };

        match self.store.find_by_username(&verified.subject).await {
            Ok(Some(principal)) if principal.enabled => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    username = %principal.username,
                    role = %principal.role,
                    "principal bound"
                );
                ctx.bind(principal);
            }
            Ok(Some(principal)) => {
                tracing::info!(
                    request_id = %ctx.request_id(),
                    username = %principal.username,
                    "token belongs to a disabled account"
                );
            }
            Ok(None) => {
                tracing::info!(
                    request_id = %ctx.request_id(),
                    subject = %verified.subject,
                    "token subject not found"
                );
            }
            Err(StoreError::Unavailable(msg)) => {
                tracing::error!(request_id = %ctx.request_id(), error = %msg, "credential store unavailable");
                ctx.record_fault(AuthFault::StoreUnavailable);
            }
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "failed to resolve token subject");
                ctx.record_fault(AuthFault::StoreUnavailable);
            }
        }
    }
}

impl Middleware for AuthMiddleware {
    fn before<'a>(
        &'a self,
        req: Request<Body>,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Request<Body>>> {
        Box::pin(async move {
            self.authenticate(req.headers(), ctx, Utc::now()).await;
            Ok(req)
        })
    }
}
