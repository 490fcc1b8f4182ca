//! SQLite credential store.
//!
//! Uniqueness is enforced by `UNIQUE` constraints on the `users` table, so
//! a duplicate that races past the service's existence checks is still
//! rejected here and reported as a duplicate rather than inserted twice.

use super::{CredentialStore, StoreError};
use crate::auth::models::{NewPrincipal, Principal, ProfileUpdate, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use tokio_rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    role TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
";

const SELECT_COLUMNS: &str =
    "SELECT id, username, email, password_hash, first_name, last_name, role, enabled, created_at FROM users";

/// Raw column values; converted to a `Principal` outside the connection thread.
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    enabled: bool,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            role: row.get(6)?,
            enabled: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_principal(self) -> Result<Principal, StoreError> {
        let role = self.role.parse::<Role>().map_err(StoreError::Corrupt)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt(format!("created_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Principal {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            enabled: self.enabled,
            created_at,
        })
    }
}

/// Which uniqueness constraint an insert or update tripped.
enum Conflict {
    Username,
    Email,
}

impl From<Conflict> for StoreError {
    fn from(conflict: Conflict) -> Self {
        match conflict {
            Conflict::Username => StoreError::DuplicateUsername,
            Conflict::Email => StoreError::DuplicateEmail,
        }
    }
}

/// Classify a constraint violation; `None` for any other error.
fn conflict_of(err: &rusqlite::Error) -> Option<Conflict> {
    match err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            if message.contains("users.username") {
                Some(Conflict::Username)
            } else if message.contains("users.email") {
                Some(Conflict::Email)
            } else {
                None
            }
        }
        _ => None,
    }
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Credential store backed by a SQLite database file
pub struct SqliteCredentialStore {
    conn: Connection,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory().await?
        } else {
            Connection::open(path).await?
        };

        let store = Self { conn };
        store.init_schema().await?;
        tracing::debug!(path, "sqlite credential store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn find_one(&self, filter: &'static str, value: String) -> Result<Option<Principal>, StoreError> {
        let row = self
            .conn
            .call(move |conn| {
                let sql = format!("{} WHERE {} = ?1", SELECT_COLUMNS, filter);
                let row = conn
                    .query_row(&sql, params![value], UserRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(UserRow::into_principal).transpose()
    }

    async fn exists(&self, filter: &'static str, value: String) -> Result<bool, StoreError> {
        let count = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT COUNT(1) FROM users WHERE {} = ?1", filter);
                let count: i64 = conn.query_row(&sql, params![value], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        self.find_one("username", username.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        self.find_one("email", email.to_string()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError> {
        let row = self
            .conn
            .call(move |conn| {
                let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
                let row = conn.query_row(&sql, params![id], UserRow::from_row).optional()?;
                Ok(row)
            })
            .await?;

        row.map(UserRow::into_principal).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        self.exists("username", username.to_string()).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.exists("email", email.to_string()).await
    }

    async fn save(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let created_at = Utc::now();
        let stamp = created_at.to_rfc3339();
        let insert = new.clone();

        let outcome = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    "INSERT INTO users (username, email, password_hash, first_name, last_name, role, enabled, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        insert.username,
                        insert.email,
                        insert.password_hash,
                        insert.first_name,
                        insert.last_name,
                        insert.role.as_str(),
                        insert.enabled,
                        stamp,
                    ],
                );
                match result {
                    Ok(_) => Ok(Ok(conn.last_insert_rowid())),
                    Err(e) => match conflict_of(&e) {
                        Some(conflict) => Ok(Err(conflict)),
                        None => Err(e.into()),
                    },
                }
            })
            .await?;

        let id = outcome.map_err(StoreError::from)?;
        Ok(Principal {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            enabled: new.enabled,
            created_at,
        })
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Principal, StoreError> {
        let outcome = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    "UPDATE users SET
                        email = COALESCE(?2, email),
                        first_name = COALESCE(?3, first_name),
                        last_name = COALESCE(?4, last_name)
                     WHERE id = ?1",
                    params![id, update.email, update.first_name, update.last_name],
                );
                match result {
                    Ok(changed) => Ok(Ok(changed)),
                    Err(e) => match conflict_of(&e) {
                        Some(conflict) => Ok(Err(conflict)),
                        None => Err(e.into()),
                    },
                }
            })
            .await?;

        if outcome.map_err(StoreError::from)? == 0 {
            return Err(StoreError::NotFound);
        }
        self.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_principal(username: &str, email: &str, role: Role) -> NewPrincipal {
        NewPrincipal {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            first_name: Some("First".to_string()),
            last_name: None,
            role,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = SqliteCredentialStore::open(":memory:").await.unwrap();
        let saved = store
            .save(new_principal("alice", "alice@x.com", Role::Admin))
            .await
            .unwrap();

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.role, Role::Admin);
        assert_eq!(found.first_name.as_deref(), Some("First"));
        assert!(found.last_name.is_none());
        assert!(found.enabled);

        assert!(store.find_by_email("alice@x.com").await.unwrap().is_some());
        assert!(store.find_by_id(saved.id).await.unwrap().is_some());
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.exists_by_username("alice").await.unwrap());
        assert!(!store.exists_by_email("nobody@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = SqliteCredentialStore::open(":memory:").await.unwrap();
        store
            .save(new_principal("alice", "alice@x.com", Role::User))
            .await
            .unwrap();

        let dup_name = store.save(new_principal("alice", "a2@x.com", Role::User)).await;
        assert_eq!(dup_name.unwrap_err(), StoreError::DuplicateUsername);

        let dup_email = store.save(new_principal("alice2", "alice@x.com", Role::User)).await;
        assert_eq!(dup_email.unwrap_err(), StoreError::DuplicateEmail);
    }

    #[tokio::test]
    async fn test_concurrent_saves_admit_one() {
        let store = Arc::new(SqliteCredentialStore::open(":memory:").await.unwrap());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save(new_principal("alice", &format!("alice{}@x.com", i), Role::User))
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, StoreError::DuplicateUsername),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = SqliteCredentialStore::open(":memory:").await.unwrap();
        let alice = store
            .save(new_principal("alice", "alice@x.com", Role::User))
            .await
            .unwrap();
        store
            .save(new_principal("bob", "bob@x.com", Role::User))
            .await
            .unwrap();

        let updated = store
            .update_profile(
                alice.id,
                ProfileUpdate {
                    email: None,
                    first_name: None,
                    last_name: Some("Liddell".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "alice@x.com");
        assert_eq!(updated.first_name.as_deref(), Some("First"));
        assert_eq!(updated.last_name.as_deref(), Some("Liddell"));

        let taken = store
            .update_profile(
                alice.id,
                ProfileUpdate {
                    email: Some("bob@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(taken.unwrap_err(), StoreError::DuplicateEmail);

        let missing = store.update_profile(42, ProfileUpdate::default()).await;
        assert_eq!(missing.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("users.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteCredentialStore::open(path).await.unwrap();
            store
                .save(new_principal("alice", "alice@x.com", Role::User))
                .await
                .unwrap();
        }

        let reopened = SqliteCredentialStore::open(path).await.unwrap();
        assert!(reopened.exists_by_username("alice").await.unwrap());
    }
}
