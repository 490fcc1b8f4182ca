//! Application assembly.
//!
//! Wires configuration into the credential store, token codec, verifier,
//! middleware stack and routes, producing a ready-to-run `Server`.

use crate::auth::bootstrap::ensure_admin;
use crate::auth::handlers::{routes, AppState};
use crate::auth::{AuthMiddleware, CredentialVerifier, PasswordHasher, TokenCodec};
use crate::config::AppConfig;
use crate::database::open_store;
use crate::middleware::LoggingMiddleware;
use crate::server::{BoxError, Server};
use std::sync::Arc;

/// Build the server described by `config`, provisioning the bootstrap
/// administrator if one is configured.
pub async fn build(config: &AppConfig) -> Result<Server<AppState>, BoxError> {
    config.validate()?;

    let store = open_store(&config.database.url).await?;
    let codec = Arc::new(TokenCodec::new(config.auth.jwt()?)?);
    let hasher = PasswordHasher::with_cost(
        config.auth.hash_memory_kib,
        config.auth.hash_iterations,
        config.auth.hash_parallelism,
    )?;
    let verifier = CredentialVerifier::new(store.clone(), hasher)?;

    if let Some(bootstrap) = &config.bootstrap {
        ensure_admin(&verifier, bootstrap).await?;
    }

    let state = Arc::new(AppState::new(verifier, codec.clone()));
    let server = Server::new(routes(), state)
        .with_middleware(Box::new(LoggingMiddleware))
        .with_middleware(Box::new(AuthMiddleware::new(codec, store)));

    Ok(server)
}
