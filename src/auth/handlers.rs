//! HTTP handlers for the authentication API.
//!
//! Login and registration issue tokens; `/api/auth/me` reads and updates the
//! caller's own profile. The `/api/test/*` probes exist so clients can check
//! which access level a token grants.

use crate::auth::context::RequestContext;
use crate::auth::error::AuthError;
use crate::auth::jwt::TokenCodec;
use crate::auth::models::{AuthResponse, LoginRequest, Principal, ProfileUpdate, RegisterRequest, Role};
use crate::auth::rbac::AccessPolicy;
use crate::auth::service::{CredentialVerifier, NewAccount};
use crate::request::{read_json, ApiRequest};
use crate::response::ApiResponse;
use crate::router::{HandlerResult, Route, Router};
use chrono::Utc;
use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    pub verifier: CredentialVerifier,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(verifier: CredentialVerifier, codec: Arc<TokenCodec>) -> Self {
        Self { verifier, codec }
    }

    fn issue_for(&self, principal: &Principal) -> Result<String, AuthError> {
        Ok(self.codec.issue(&principal.username, principal.role, Utc::now())?)
    }
}

fn current_principal(ctx: &RequestContext) -> Result<&Principal, AuthError> {
    ctx.principal().ok_or(AuthError::Unauthenticated)
}

/// POST /api/auth/login
pub async fn login(req: ApiRequest, _ctx: RequestContext, state: Arc<AppState>) -> HandlerResult {
    let credentials: LoginRequest = read_json(req).await?;
    let principal = state
        .verifier
        .login(&credentials.username, &credentials.password)
        .await?;
    let token = state.issue_for(&principal)?;

    Ok(ApiResponse::new(StatusCode::OK)
        .json(&AuthResponse::for_principal(&principal, Some(token)).with_message("login successful")))
}

/// POST /api/auth/register
pub async fn register(req: ApiRequest, _ctx: RequestContext, state: Arc<AppState>) -> HandlerResult {
    let body: RegisterRequest = read_json(req).await?;
    let principal = state
        .verifier
        .register(NewAccount {
            username: body.username,
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
        })
        .await?;
    let token = state.issue_for(&principal)?;

    Ok(ApiResponse::new(StatusCode::CREATED)
        .json(&AuthResponse::for_principal(&principal, Some(token)).with_message("registration successful")))
}

/// GET /api/auth/me
pub async fn me(_req: ApiRequest, ctx: RequestContext, _state: Arc<AppState>) -> HandlerResult {
    let principal = current_principal(&ctx)?;
    Ok(ApiResponse::new(StatusCode::OK).json(&principal.profile()))
}

/// PUT /api/auth/me
pub async fn update_me(req: ApiRequest, ctx: RequestContext, state: Arc<AppState>) -> HandlerResult {
    let id = current_principal(&ctx)?.id;
    let update: ProfileUpdate = read_json(req).await?;
    let updated = state.verifier.update_profile(id, update).await?;

    Ok(ApiResponse::new(StatusCode::OK)
        .json(&AuthResponse::for_principal(&updated, None).with_message("profile updated")))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its token.
pub async fn logout(_req: ApiRequest, _ctx: RequestContext, _state: Arc<AppState>) -> HandlerResult {
    Ok(ApiResponse::message(StatusCode::OK, "logged out"))
}

/// GET /api/test/public
pub async fn public_probe(_req: ApiRequest, _ctx: RequestContext, _state: Arc<AppState>) -> HandlerResult {
    Ok(ApiResponse::message(StatusCode::OK, "public content"))
}

/// GET /api/test/user
pub async fn user_probe(_req: ApiRequest, ctx: RequestContext, _state: Arc<AppState>) -> HandlerResult {
    let principal = current_principal(&ctx)?;
    Ok(ApiResponse::new(StatusCode::OK).json(&json!({
        "message": "user content",
        "username": principal.username,
        "role": principal.role,
    })))
}

/// GET /api/test/admin
pub async fn admin_probe(_req: ApiRequest, ctx: RequestContext, _state: Arc<AppState>) -> HandlerResult {
    let principal = current_principal(&ctx)?;
    Ok(ApiResponse::new(StatusCode::OK).json(&json!({
        "message": "admin content",
        "username": principal.username,
        "role": principal.role,
    })))
}

/// All authentication routes with their access policies.
pub fn routes() -> Router<AppState> {
    let mut router = Router::new();

    router.add_route(Route::new("POST", "/api/auth/register", register));
    router.add_route(Route::new("POST", "/api/auth/login", login));
    router.add_route(Route::new("POST", "/api/auth/logout", logout));
    router.add_route(Route::new("GET", "/api/auth/me", me).with_policy(AccessPolicy::Authenticated));
    router.add_route(Route::new("PUT", "/api/auth/me", update_me).with_policy(AccessPolicy::Authenticated));

    router.add_route(Route::new("GET", "/api/test/public", public_probe));
    router.add_route(Route::new("GET", "/api/test/user", user_probe).with_policy(AccessPolicy::Authenticated));
    router.add_route(
        Route::new("GET", "/api/test/admin", admin_probe).with_policy(AccessPolicy::Role(Role::Admin)),
    );

    router
}
