//! Configuration module - Environment and file-based configuration management.
//!
//! Sources, lowest priority first: built-in defaults, `config/default`,
//! `config/local`, `config.yml`/`config.toml`, then environment variables of
//! the form `CATALOG_AUTH__SECTION__KEY`. A `.env` file is loaded first if
//! present.

use crate::auth::jwt::{JwtConfig, TokenError, MAX_TOKEN_TTL_SECS, MIN_SECRET_LEN};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "CATALOG_AUTH";

/// Main application configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    /// Administrator provisioned at startup, if configured.
    pub bootstrap: Option<BootstrapConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `memory` or `sqlite:<path>`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:catalog-auth.db".to_string(),
        }
    }
}

/// Authentication configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. No default; must be configured.
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub issuer: String,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 86_400,
            issuer: "catalog-auth".to_string(),
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
            hash_parallelism: 1,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("issuer", &self.issuer)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("hash_iterations", &self.hash_iterations)
            .field("hash_parallelism", &self.hash_parallelism)
            .finish()
    }
}

impl AuthConfig {
    /// Token codec settings derived from this section.
    pub fn jwt(&self) -> Result<JwtConfig, TokenError> {
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs) {
            return Err(TokenError::Config(format!(
                "token_ttl_secs must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            )));
        }
        Ok(JwtConfig {
            secret: self.jwt_secret.clone(),
            ttl: chrono::Duration::seconds(self.token_ttl_secs),
            issuer: self.issuer.clone(),
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Initial administrator account.
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().ok();
        }

        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if Path::new("config.yml").exists() || Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder.add_source(environment()).build()?.try_deserialize()
    }

    /// Load configuration with custom file path. Environment variables still override.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().ok();
        }

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Get server bind address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "auth.jwt_secret must be at least {} bytes long",
                MIN_SECRET_LEN
            ));
        }

        if self.auth.token_ttl_secs <= 0 {
            return Err("auth.token_ttl_secs must be positive".to_string());
        }

        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "auth.token_ttl_secs must not exceed {} (ten years)",
                MAX_TOKEN_TTL_SECS
            ));
        }

        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        let url = self.database.url.as_str();
        if url != "memory" && !url.starts_with("sqlite:") {
            return Err(format!("unsupported database url: {}", url));
        }

        Ok(())
    }
}
