//! Initial administrator provisioning.
//!
//! Registration always creates USER accounts, so the first ADMIN comes from
//! configuration at startup.

use crate::auth::error::AuthError;
use crate::auth::models::{Principal, Role};
use crate::auth::service::{CredentialVerifier, NewAccount};
use crate::config::BootstrapConfig;

/// Create the configured administrator unless the username already exists.
///
/// Returns the new principal, or `None` if it was already present.
pub async fn ensure_admin(
    verifier: &CredentialVerifier,
    config: &BootstrapConfig,
) -> Result<Option<Principal>, AuthError> {
    let account = NewAccount {
        username: config.username.clone(),
        email: config.email.clone(),
        password: config.password.clone(),
        first_name: None,
        last_name: None,
    };

    match verifier.provision(account, Role::Admin).await {
        Ok(principal) => {
            tracing::info!(username = %principal.username, "bootstrap administrator created");
            Ok(Some(principal))
        }
        Err(AuthError::DuplicateUsername) => {
            tracing::debug!(username = %config.username, "bootstrap administrator already present");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordHasher;
    use crate::database::{CredentialStore, MemoryCredentialStore};
    use std::sync::Arc;

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            username: "admin".to_string(),
            email: "admin@catalog.local".to_string(),
            password: "change-me-now".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let verifier = CredentialVerifier::new(store.clone(), PasswordHasher::with_cost(1024, 1, 1).unwrap()).unwrap();

        let created = ensure_admin(&verifier, &config()).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert!(ensure_admin(&verifier, &config()).await.unwrap().is_none());

        let admin = verifier.login("admin", "change-me-now").await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(store.find_by_username("admin").await.unwrap().unwrap().id, created.id);
    }
}
