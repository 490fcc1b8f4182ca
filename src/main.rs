//! catalog-auth server
//!
//! Loads configuration, installs tracing and serves the authentication API.

use catalog_auth::observability::init_tracing;
use catalog_auth::{app, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuration validation failed");
        std::process::exit(1);
    }

    tracing::info!(
        addr = %config.server_addr(),
        database = %config.database.url,
        token_ttl_secs = config.auth.token_ttl_secs,
        "starting catalog-auth"
    );

    let server = app::build(&config).await?;
    server.run(&config.server_addr()).await
}
