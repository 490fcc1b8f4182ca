//! Credential verification service.
//!
//! `CredentialVerifier` checks username/password pairs, registers new
//! accounts and applies profile updates. Argon2 work runs on the blocking
//! pool so it never stalls the request executor.

use crate::auth::error::AuthError;
use crate::auth::models::{NewPrincipal, Principal, ProfileUpdate, Role};
use crate::auth::password::PasswordHasher;
use crate::database::CredentialStore;
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Data supplied when creating an account
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login, registration and profile maintenance over a credential store
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    /// Verified against when the username is unknown, so both failure paths
    /// cost one Argon2 verification.
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            hasher: Arc::new(hasher),
            dummy_hash,
        })
    }

    /// Check a username/password pair.
    ///
    /// Unknown username and wrong password are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let principal = self.store.find_by_username(username).await?;

        let hash = match &principal {
            Some(p) => p.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self.verify_blocking(password.to_string(), hash).await?;

        match principal {
            Some(principal) if matches => {
                if !principal.enabled {
                    tracing::info!(username = %principal.username, "login refused: account disabled");
                    return Err(AuthError::AccountDisabled);
                }
                tracing::info!(username = %principal.username, "login succeeded");
                Ok(principal)
            }
            _ => {
                tracing::info!(username, "login failed: invalid credentials");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Create a USER account. Callers cannot choose the role.
    pub async fn register(&self, account: NewAccount) -> Result<Principal, AuthError> {
        validate_account(&account)?;
        self.create(account, Role::User).await
    }

    /// Create an account with an explicit role.
    ///
    /// Used by administrative provisioning only; never reachable over HTTP.
    pub(crate) async fn provision(&self, account: NewAccount, role: Role) -> Result<Principal, AuthError> {
        validate_account(&account)?;
        self.create(account, role).await
    }

    async fn create(&self, account: NewAccount, role: Role) -> Result<Principal, AuthError> {
        if self.store.exists_by_username(&account.username).await? {
            return Err(AuthError::DuplicateUsername);
        }
        if self.store.exists_by_email(&account.email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_blocking(account.password).await?;
        let principal = self
            .store
            .save(NewPrincipal {
                username: account.username,
                email: account.email,
                password_hash,
                first_name: account.first_name,
                last_name: account.last_name,
                role,
                enabled: true,
            })
            .await?;

        tracing::info!(username = %principal.username, role = %principal.role, "account created");
        Ok(principal)
    }

    /// Apply a profile update to the account `id`.
    pub async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Principal, AuthError> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        let principal = self.store.update_profile(id, update).await?;
        tracing::info!(username = %principal.username, "profile updated");
        Ok(principal)
    }

    async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {}", e)))
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {}", e)))??;
        Ok(hashed)
    }
}

fn validate_account(account: &NewAccount) -> Result<(), AuthError> {
    // Stored verbatim, so "alice " would otherwise shadow "alice".
    if account.username.trim() != account.username {
        return Err(AuthError::Validation(
            "username must not start or end with whitespace".to_string(),
        ));
    }
    if account.username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::Validation(format!(
            "username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    validate_email(&account.email)?;
    if account.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.trim() != email {
        return Err(AuthError::Validation(
            "email must not start or end with whitespace".to_string(),
        ));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::Validation("email must be a valid address".to_string())),
    }
}
