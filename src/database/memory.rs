//! In-memory credential store.
//!
//! Uniqueness checks and the insert run under one write guard, so two
//! concurrent registrations of the same username cannot both succeed.

use super::{CredentialStore, StoreError};
use crate::auth::models::{NewPrincipal, Principal, ProfileUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, Principal>,
    by_username: HashMap<String, i64>,
    by_email: HashMap<String, i64>,
}

/// Credential store backed by process memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_username
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.by_username.contains_key(username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.by_email.contains_key(email))
    }

    async fn save(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.by_username.contains_key(&new.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if tables.by_email.contains_key(&new.email) {
            return Err(StoreError::DuplicateEmail);
        }

        tables.next_id += 1;
        let principal = Principal {
            id: tables.next_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            enabled: new.enabled,
            created_at: chrono::Utc::now(),
        };
        tables.by_username.insert(principal.username.clone(), principal.id);
        tables.by_email.insert(principal.email.clone(), principal.id);
        tables.users.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Principal, StoreError> {
        let mut tables = self.tables.write().await;
        let current_email = match tables.users.get(&id) {
            Some(existing) => existing.email.clone(),
            None => return Err(StoreError::NotFound),
        };

        if let Some(email) = &update.email {
            if *email != current_email {
                if tables.by_email.contains_key(email) {
                    return Err(StoreError::DuplicateEmail);
                }
                tables.by_email.remove(&current_email);
                tables.by_email.insert(email.clone(), id);
            }
        }

        let principal = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = update.email {
            principal.email = email;
        }
        if let Some(first_name) = update.first_name {
            principal.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            principal.last_name = Some(last_name);
        }
        Ok(principal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use std::sync::Arc;

    fn new_principal(username: &str, email: &str) -> NewPrincipal {
        NewPrincipal {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            role: Role::User,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = MemoryCredentialStore::new();
        let saved = store.save(new_principal("alice", "alice@x.com")).await.unwrap();
        assert_eq!(saved.id, 1);

        let by_name = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name, saved);
        let by_email = store.find_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, saved.id);
        assert!(store.find_by_id(saved.id).await.unwrap().is_some());

        assert!(store.exists_by_username("alice").await.unwrap());
        assert!(!store.exists_by_username("bob").await.unwrap());
        assert!(store.exists_by_email("alice@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_uniqueness() {
        let store = MemoryCredentialStore::new();
        store.save(new_principal("alice", "alice@x.com")).await.unwrap();

        assert_eq!(
            store.save(new_principal("alice", "other@x.com")).await.unwrap_err(),
            StoreError::DuplicateUsername
        );
        assert_eq!(
            store.save(new_principal("bob", "alice@x.com")).await.unwrap_err(),
            StoreError::DuplicateEmail
        );
    }

    #[tokio::test]
    async fn test_concurrent_saves_admit_one() {
        let store = Arc::new(MemoryCredentialStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save(new_principal("alice", &format!("alice{}@x.com", i))).await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateUsername) => dup += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 15);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = MemoryCredentialStore::new();
        let alice = store.save(new_principal("alice", "alice@x.com")).await.unwrap();
        store.save(new_principal("bob", "bob@x.com")).await.unwrap();

        let updated = store
            .update_profile(
                alice.id,
                ProfileUpdate {
                    email: Some("alice@y.com".to_string()),
                    first_name: Some("Alice".to_string()),
                    last_name: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "alice@y.com");
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));
        assert!(store.find_by_email("alice@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("alice@y.com").await.unwrap().is_some());

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

        let missing = store.update_profile(99, ProfileUpdate::default()).await;
        assert_eq!(missing.unwrap_err(), StoreError::NotFound);
    }
}
