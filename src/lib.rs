//! catalog-auth: stateless token authentication for the catalog backend.
//! Core library entry point. Re-exports main modules for developer ergonomics.

pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod observability;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

// Re-export commonly used types for convenience
pub use auth::{AccessPolicy, AppState, AuthError, AuthMiddleware, Principal, RequestContext, Role};
pub use config::AppConfig;
pub use database::{CredentialStore, StoreError};
pub use errors::ApiError;
pub use middleware::Middleware;
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use router::{Route, Router};
pub use server::Server;
