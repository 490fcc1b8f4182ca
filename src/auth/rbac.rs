//! Role-Based Access Control (RBAC) implementation.
//!
//! Every route declares an `AccessPolicy` when it is registered. The router
//! evaluates it with `authorize` after the request has been authenticated and
//! before the handler runs.

use crate::auth::context::{AuthFault, RequestContext};
use crate::auth::error::AuthError;
use crate::auth::models::Role;
use std::fmt;

/// Access requirement attached to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicy {
    /// Anyone, authenticated or not
    #[default]
    Public,
    /// Any authenticated principal
    Authenticated,
    /// A principal whose role equals or outranks the given one
    Role(Role),
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPolicy::Public => f.write_str("public"),
            AccessPolicy::Authenticated => f.write_str("authenticated"),
            AccessPolicy::Role(role) => write!(f, "role:{}", role),
        }
    }
}

/// Check `policy` against the principal bound in `ctx`.
///
/// With no principal bound, a protected route fails with `Unauthenticated`,
/// or with `StoreUnavailable` when authentication could not reach the store.
pub fn authorize(policy: &AccessPolicy, ctx: &RequestContext) -> Result<(), AuthError> {
    let required = match policy {
        AccessPolicy::Public => return Ok(()),
        AccessPolicy::Authenticated => None,
        AccessPolicy::Role(role) => Some(*role),
    };

    let principal = match ctx.principal() {
        Some(principal) => principal,
        None => {
            return match ctx.auth_fault() {
                Some(AuthFault::StoreUnavailable) => Err(AuthError::StoreUnavailable(
                    "credential store unreachable during authentication".to_string(),
                )),
                None => Err(AuthError::Unauthenticated),
            };
        }
    };

    match required {
        Some(role) if !principal.role.satisfies(role) => {
            tracing::debug!(
                username = %principal.username,
                role = %principal.role,
                required = %role,
                "insufficient role"
            );
            Err(AuthError::Forbidden)
        }
        _ => Ok(()),
    }
}
