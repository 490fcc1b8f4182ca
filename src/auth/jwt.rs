//! JWT token issuance and validation.
//!
//! Tokens are HS256-signed JWTs carrying the subject username, its role,
//! issue time, expiry and issuer. Verification is stateless: it consults only
//! the token, the caller-supplied `now` and the process-wide secret.

use crate::auth::models::Role;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime, in seconds (ten years).
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// JWT token claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiration, seconds since the epoch
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Token codec configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Lifetime of an issued token
    pub ttl: Duration,
    /// Issuer
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Errors that can occur during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid token configuration: {0}")]
    Config(String),
}

impl TokenError {
    /// Short failure class for logs.
    pub fn class(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
            TokenError::Signing(_) => "signing",
            TokenError::Config(_) => "config",
        }
    }
}

/// Identity asserted by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens. The only component that knows the token format.
pub struct TokenCodec {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec, rejecting secrets that are too short and TTLs outside
    /// `1..=MAX_TOKEN_TTL_SECS` seconds.
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::Config(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if config.ttl <= Duration::zero() {
            return Err(TokenError::Config("ttl must be positive".to_string()));
        }
        if config.ttl > Duration::seconds(MAX_TOKEN_TTL_SECS) {
            return Err(TokenError::Config(format!(
                "ttl must not exceed {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked against the caller's `now`, not the library's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    /// Issue a token for `subject` valid from `now` until `now + ttl`
    pub fn issue(&self, subject: &str, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.config.ttl)
            .ok_or_else(|| TokenError::Config("token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a token at instant `now`.
    ///
    /// Structure, signature and expiry must all hold; any single failure rejects.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| classify(e.kind()))?;
        let claims = token_data.claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or(TokenError::Malformed)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or(TokenError::Malformed)?;

        Ok(VerifiedToken {
            subject: claims.sub,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-that-is-long-enough-for-hs256";

    fn codec() -> TokenCodec {
        TokenCodec::new(JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::hours(1),
            issuer: "catalog-auth".to_string(),
        })
        .unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_token_creation_and_validation() {
        let codec = codec();
        let now = at(1_700_000_000);

        let token = codec.issue("alice", Role::User, now).unwrap();
        assert!(!token.is_empty());
        assert_eq!(token.split('.').count(), 3);

        let verified = codec.verify(&token, now).unwrap();
        assert_eq!(verified.subject, "alice");
        assert_eq!(verified.role, Role::User);
        assert_eq!(verified.issued_at, now);
        assert_eq!(verified.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let issued = at(1_700_000_000);
        let token = codec.issue("alice", Role::Admin, issued).unwrap();

        let last_valid = issued + Duration::hours(1) - Duration::seconds(1);
        assert!(codec.verify(&token, last_valid).is_ok());

        for offset in [0, 1, 60, 86_400 * 365] {
            let now = issued + Duration::hours(1) + Duration::seconds(offset);
            assert_eq!(codec.verify(&token, now), Err(TokenError::Expired));
        }
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.issue("alice", Role::User, now).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let payload = parts[1];
        for i in 0..payload.len() {
            let mut bytes = payload.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = format!("{}.{}.{}", parts[0], String::from_utf8(bytes).unwrap(), parts[2]);
            assert_eq!(
                codec.verify(&mutated, now),
                Err(TokenError::BadSignature),
                "mutation at payload byte {} was not rejected",
                i
            );
        }
    }

    #[test]
    fn test_tampered_signature_is_bad_signature() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.issue("alice", Role::User, now).unwrap();

        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut sig = sig.as_bytes().to_vec();
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
        let mutated = format!("{}.{}", head, String::from_utf8(sig).unwrap());

        assert_eq!(codec.verify(&mutated, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_secret_is_bad_signature() {
        let now = at(1_700_000_000);
        let other = TokenCodec::new(JwtConfig {
            secret: "another-secret-that-is-also-long-enough-here".to_string(),
            ttl: Duration::hours(1),
            issuer: "catalog-auth".to_string(),
        })
        .unwrap();
        let token = other.issue("alice", Role::Admin, now).unwrap();

        assert_eq!(codec().verify(&token, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_expired_and_mis_signed_is_rejected() {
        let issued = at(1_700_000_000);
        let token = codec().issue("alice", Role::User, issued).unwrap();
        let (head, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{}.AAAA", head);

        let later = issued + Duration::days(2);
        assert!(codec().verify(&forged, later).is_err());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();
        let now = at(1_700_000_000);
        for garbage in ["garbage", "a.b", "", "....", "not.a.jwt"] {
            assert_eq!(codec.verify(garbage, now), Err(TokenError::Malformed), "{:?}", garbage);
        }
    }

    #[test]
    fn test_foreign_issuer_is_malformed() {
        let now = at(1_700_000_000);
        let foreign = TokenCodec::new(JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::hours(1),
            issuer: "someone-else".to_string(),
        })
        .unwrap();
        let token = foreign.issue("alice", Role::User, now).unwrap();

        assert_eq!(codec().verify(&token, now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_rejects_weak_configuration() {
        let short = TokenCodec::new(JwtConfig {
            secret: "short".to_string(),
            ttl: Duration::hours(1),
            issuer: "catalog-auth".to_string(),
        });
        assert!(matches!(short, Err(TokenError::Config(_))));

        let no_ttl = TokenCodec::new(JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::zero(),
            issuer: "catalog-auth".to_string(),
        });
        assert!(matches!(no_ttl, Err(TokenError::Config(_))));

        let endless = TokenCodec::new(JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::seconds(MAX_TOKEN_TTL_SECS + 1),
            issuer: "catalog-auth".to_string(),
        });
        assert!(matches!(endless, Err(TokenError::Config(_))));
    }

    #[test]
    fn test_issue_near_the_end_of_time_fails_cleanly() {
        let codec = codec();
        let result = codec.issue("alice", Role::User, DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(TokenError::Config(_))));
    }

    #[test]
    fn test_longest_ttl_is_accepted() {
        let codec = TokenCodec::new(JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::seconds(MAX_TOKEN_TTL_SECS),
            issuer: "catalog-auth".to_string(),
        })
        .unwrap();
        let now = at(1_700_000_000);
        let token = codec.issue("alice", Role::User, now).unwrap();
        assert_eq!(
            codec.verify(&token, now).unwrap().expires_at,
            now + Duration::seconds(MAX_TOKEN_TTL_SECS)
        );
    }

    #[test]
    fn test_config_debug_hides_secret() {
        let config = JwtConfig {
            secret: SECRET.to_string(),
            ttl: Duration::hours(1),
            issuer: "catalog-auth".to_string(),
        };
        assert!(!format!("{:?}", config).contains(SECRET));
    }
}
