//! Database module - credential store abstraction and backends.
//!
//! The credential store owns principal persistence. Backends guarantee that
//! username and email uniqueness hold even under concurrent inserts and
//! report violations as `DuplicateUsername` / `DuplicateEmail`.

pub mod memory;
pub mod sqlite;

use crate::auth::models::{NewPrincipal, Principal, ProfileUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

/// Errors reported by a credential store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("record not found")]
    NotFound,

    /// The store could not be reached or failed to execute the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Persistence contract for principals.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Insert a new principal. Uniqueness is enforced atomically with the insert.
    async fn save(&self, principal: NewPrincipal) -> Result<Principal, StoreError>;

    /// Apply a profile update and return the updated principal.
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Principal, StoreError>;
}

/// Open the store named by a `database.url` setting.
///
/// Accepted forms: `memory` and `sqlite:<path>` (`sqlite::memory:` for an
/// in-memory SQLite database).
pub async fn open_store(url: &str) -> Result<Arc<dyn CredentialStore>, StoreError> {
    if url == "memory" {
        return Ok(Arc::new(MemoryCredentialStore::new()));
    }
    if let Some(path) = url.strip_prefix("sqlite:") {
        let store = SqliteCredentialStore::open(path).await?;
        return Ok(Arc::new(store));
    }
    Err(StoreError::Unavailable(format!("unsupported database url: {}", url)))
}
