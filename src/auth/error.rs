//! Authentication and authorization errors.

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::database::StoreError;
use hyper::StatusCode;
use thiserror::Error;

/// Every way an auth operation can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled")]
    AccountDisabled,

    #[error("username already exists")]
    DuplicateUsername,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("malformed token")]
    TokenMalformed,

    #[error("token signature mismatch")]
    TokenBadSignature,

    #[error("token expired")]
    TokenExpired,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("principal not found")]
    PrincipalNotFound,

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status this error is surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::TokenMalformed
            | AuthError::TokenBadSignature
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::DuplicateUsername | AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::PrincipalNotFound => StatusCode::NOT_FOUND,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::StoreUnavailable(_) => "service temporarily unavailable".to_string(),
            AuthError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::BadSignature => AuthError::TokenBadSignature,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Signing(msg) | TokenError::Config(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::NotFound => AuthError::PrincipalNotFound,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            StoreError::Corrupt(msg) => AuthError::Internal(msg),
        }
    }
}
