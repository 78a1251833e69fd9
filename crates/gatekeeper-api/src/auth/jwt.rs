//! Token issuance and validation
//!
//! Implements HMAC-SHA256 signed tokens carrying the caller's identity.
//! The signing secret and issuer are injected at construction; the token
//! lifetime depends on the environment mode passed to [`TokenCodec::issue`].

use gatekeeper_core::{AuthConfig, Environment, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Token lifetime outside development: 15 minutes
pub const PRODUCTION_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Token lifetime in development: 24 hours
pub const DEVELOPMENT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Lifetime of a token issued in the given mode
pub fn token_ttl_secs(environment: Environment) -> u64 {
    match environment {
        Environment::Development => DEVELOPMENT_TOKEN_TTL_SECS,
        Environment::Production => PRODUCTION_TOKEN_TTL_SECS,
    }
}

/// Identity claims embedded in a signed token
///
/// Claims are read-only once built: they are created by [`TokenCodec::issue`]
/// and reconstructed by [`TokenCodec::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    user_id: i64,
    username: String,
    role: Role,
    iss: String,
    iat: u64,
    exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// Issued at (Unix seconds)
    pub fn issued_at(&self) -> u64 {
        self.iat
    }

    /// Expiration (Unix seconds)
    pub fn expires_at(&self) -> u64 {
        self.exp
    }
}

/// Token issuance and validation errors
///
/// The variants are for diagnostics only. At the HTTP boundary every
/// validation failure is reported as the same "invalid token" outcome.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,
}

impl TokenError {
    /// Short classification used in audit records
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Signing(_) => "signing_error",
            TokenError::Malformed => "malformed",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired => "expired",
        }
    }
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Signs and verifies identity tokens with a shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    issuer: String,
    clock: Clock,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("has_secret", &self.has_secret)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            has_secret: !secret.is_empty(),
            issuer: config.issuer.clone(),
            clock: Arc::new(system_clock),
        }
    }

    /// Replace the clock used for `iat`/`exp` and for expiry checks
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a signed token for an authenticated user
    ///
    /// # Arguments
    ///
    /// * `user_id` - Store-assigned user id
    /// * `username` - Login name
    /// * `role` - Role checked by the role gate
    /// * `environment` - Mode deciding the token lifetime
    ///
    /// # Errors
    ///
    /// [`TokenError::Signing`] when no secret is configured or encoding fails.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
        environment: Environment,
    ) -> Result<String, TokenError> {
        if !self.has_secret {
            return Err(TokenError::Signing("signing secret is not configured".to_string()));
        }

        let now = (self.clock)();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            role,
            iss: self.issuer.clone(),
            iat: now,
            exp: now + token_ttl_secs(environment),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a token and extract its claims
    ///
    /// Checks, in order: structure, signature, issuer, then expiry against
    /// the codec's clock. No leeway is applied.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if !self.has_secret {
            return Err(TokenError::SignatureInvalid);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Expiry is checked below against our own clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.exp <= (self.clock)() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_and_validate_token() {
        let codec = TokenCodec::new(&config("test-secret"));

        let token = codec
            .issue(42, "alice", Role::User, Environment::Production)
            .expect("Failed to issue token");
        let claims = codec.validate(&token).expect("Failed to validate token");

        assert_eq!(claims.user_id(), 42);
        assert_eq!(claims.username(), "alice");
        assert_eq!(claims.role(), Role::User);
        assert_eq!(claims.issuer(), "gatekeeper-api");
    }

    #[test]
    fn test_lifetime_depends_on_environment() {
        let codec = TokenCodec::new(&config("test-secret")).with_clock(|| 1_000_000);

        let prod = codec
            .issue(1, "a", Role::User, Environment::Production)
            .unwrap();
        let dev = codec
            .issue(1, "a", Role::User, Environment::Development)
            .unwrap();

        let prod = codec.validate(&prod).unwrap();
        let dev = codec.validate(&dev).unwrap();

        assert_eq!(prod.expires_at(), 1_000_000 + 15 * 60);
        assert_eq!(dev.expires_at(), 1_000_000 + 24 * 60 * 60);
        assert!(prod.expires_at() > prod.issued_at());
    }

    #[test]
    fn test_malformed_token() {
        let codec = TokenCodec::new(&config("test-secret"));
        let result = codec.validate("invalid.token.here");
        assert!(matches!(result, Err(TokenError::Malformed)));

        let result = codec.validate("");
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn test_wrong_secret() {
        let codec1 = TokenCodec::new(&config("secret1"));
        let codec2 = TokenCodec::new(&config("secret2"));

        let token = codec1
            .issue(1, "alice", Role::Admin, Environment::Development)
            .unwrap();

        let result = codec2.validate(&token);
        assert!(matches!(result, Err(TokenError::SignatureInvalid)));
    }

    #[test]
    fn test_altered_signature_byte() {
        let codec = TokenCodec::new(&config("test-secret"));
        let token = codec
            .issue(1, "alice", Role::User, Environment::Development)
            .unwrap();

        // Flip one character in the middle of the signature segment
        let sig_start = token.rfind('.').unwrap() + 1;
        let idx = sig_start + (token.len() - sig_start) / 2;
        let original = token.as_bytes()[idx] as char;
        let replacement = if original == 'A' { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(idx..idx + 1, replacement);

        let result = codec.validate(&tampered);
        assert!(matches!(result, Err(TokenError::SignatureInvalid)));
    }

    #[test]
    fn test_tampered_claims() {
        let codec = TokenCodec::new(&config("test-secret"));
        let token = codec
            .issue(1, "mallory", Role::User, Environment::Development)
            .unwrap();

        // Re-sign the same claims with a promoted role under another key
        let mut claims = codec.validate(&token).unwrap();
        claims.role = Role::Admin;
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"attacker"),
        )
        .unwrap();

        // Splice the forged payload onto the genuine signature
        let genuine_sig = token.rsplit('.').next().unwrap();
        let forged_body = forged.rsplit_once('.').unwrap().0;
        let spliced = format!("{forged_body}.{genuine_sig}");

        assert!(matches!(
            codec.validate(&spliced),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_expired_token() {
        let now = system_clock();
        let codec = TokenCodec::new(&config("test-secret"));

        // Create a token that expired 1 hour ago
        let claims = Claims {
            user_id: 1,
            username: "alice".to_string(),
            role: Role::User,
            iss: codec.issuer().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = codec.validate(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_expires_once_lifetime_elapses() {
        let issued_at = 1_700_000_000;
        let issuer = TokenCodec::new(&config("test-secret")).with_clock(move || issued_at);
        let token = issuer
            .issue(1, "alice", Role::User, Environment::Production)
            .unwrap();

        let just_before = TokenCodec::new(&config("test-secret"))
            .with_clock(move || issued_at + PRODUCTION_TOKEN_TTL_SECS - 1);
        assert!(just_before.validate(&token).is_ok());

        let at_expiry = TokenCodec::new(&config("test-secret"))
            .with_clock(move || issued_at + PRODUCTION_TOKEN_TTL_SECS);
        assert!(matches!(
            at_expiry.validate(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let other = TokenCodec::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: "someone-else".to_string(),
            ..Default::default()
        });
        let codec = TokenCodec::new(&config("test-secret"));

        let token = other
            .issue(1, "alice", Role::User, Environment::Development)
            .unwrap();
        assert!(matches!(codec.validate(&token), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_missing_secret() {
        let codec = TokenCodec::new(&config(""));

        let result = codec.issue(1, "alice", Role::User, Environment::Development);
        assert!(matches!(result, Err(TokenError::Signing(_))));

        let forged = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                user_id: 1,
                username: "alice".to_string(),
                role: Role::Admin,
                iss: "gatekeeper-api".to_string(),
                iat: 0,
                exp: u64::MAX / 2,
            },
            &EncodingKey::from_secret(b""),
        )
        .unwrap();
        assert!(codec.validate(&forged).is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(TokenError::Malformed.kind(), "malformed");
        assert_eq!(TokenError::SignatureInvalid.kind(), "signature_invalid");
        assert_eq!(TokenError::Expired.kind(), "expired");
    }
}
