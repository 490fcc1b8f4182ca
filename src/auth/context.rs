//! Request-scoped authentication context.
//!
//! A `RequestContext` is created empty for every request, populated by the
//! request authenticator, read by the authorization gate and handed to the
//! handler. It is dropped with the request, so nothing leaks between requests.

use crate::auth::models::Principal;
use std::time::Instant;
use uuid::Uuid;

/// Infrastructure problem encountered while authenticating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFault {
    /// The credential store could not be queried for the token's subject.
    StoreUnavailable,
}

/// Per-request security state
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    started_at: Instant,
    principal: Option<Principal>,
    auth_fault: Option<AuthFault>,
}

impl RequestContext {
    /// Create an anonymous context with a fresh request id
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            started_at: Instant::now(),
            principal: None,
            auth_fault: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the request entered the server
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Bind an authenticated principal. The first binding wins; returns
    /// `false` if a principal was already bound.
    pub fn bind(&mut self, principal: Principal) -> bool {
        if self.principal.is_some() {
            return false;
        }
        self.principal = Some(principal);
        true
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Record an infrastructure fault hit during authentication.
    pub fn record_fault(&mut self, fault: AuthFault) {
        self.auth_fault = Some(fault);
    }

    pub fn auth_fault(&self) -> Option<AuthFault> {
        self.auth_fault
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
