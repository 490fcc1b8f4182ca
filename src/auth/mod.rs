//! Authentication and Authorization module.
//!
//! This module provides the stateless token authentication subsystem:
//! - Argon2id password hashing
//! - HS256 JWT issuance and verification
//! - Credential verification (login, registration, profile updates)
//! - Per-request bearer authentication middleware
//! - Route access policies (RBAC)
//! - HTTP handlers for the `/api/auth` endpoints

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rbac;
pub mod service;

// Re-export commonly used types
pub use context::{AuthFault, RequestContext};
pub use error::AuthError;
pub use handlers::AppState;
pub use jwt::{Claims, JwtConfig, TokenCodec, TokenError, VerifiedToken};
pub use middleware::AuthMiddleware;
pub use models::{Principal, Role, UserProfile};
pub use password::PasswordHasher;
pub use rbac::{authorize, AccessPolicy};
pub use service::{CredentialVerifier, NewAccount};
