//! # Token Codec
//!
//! Encodes, decodes and validates the HMAC-signed JWTs minted by the auth service.
//! Validation is local only: the gateway never calls out to the auth service to
//! check a token, so every decision is a pure function of the token, the shared
//! secret and the clock.
//!
//! Claims on the wire:
//!
//! ```json
//! { "sub": "alice", "role": "CUSTOMER", "userId": 42, "iat": 1700000000, "exp": 1700086400 }
//! ```

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::{JwtConfig, MIN_SECRET_LEN};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{AuthenticatedUser, Role};

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: Role,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

impl Claims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn into_user(self) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: self.user_id,
            username: self.sub,
            role: self.role,
        }
    }
}

/// Reasons a token is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidToken {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature does not verify")]
    Signature,

    #[error("Token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for InvalidToken {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => InvalidToken::Signature,
            _ => InvalidToken::Malformed(err.to_string()),
        }
    }
}

/// Signs and verifies bearer tokens with the shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec; the secret must be at least 32 bytes
    pub fn new(secret: &str, ttl: Duration) -> GatewayResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(GatewayError::config(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        // The auth service picks the HMAC size from the key length, so accept all three.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_required_spec_claims(&["exp", "sub"]);
        // Expiry is checked by hand with zero leeway: `exp <= now` is expired.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn from_config(config: &JwtConfig) -> GatewayResult<Self> {
        Self::new(&config.secret, config.token_ttl)
    }

    /// Issue a token for `subject` that expires after the configured TTL
    pub fn encode(&self, subject: &str, role: Role, user_id: i64) -> GatewayResult<String> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| GatewayError::config(format!("Token TTL is out of range: {:?}", self.ttl)))?;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            user_id,
            iat: now,
            exp,
        };
        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &Claims) -> GatewayResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| GatewayError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Decode a token, rejecting bad signatures, malformed payloads and expired tokens
    pub fn decode(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// True if the token is expired or cannot be decoded at all
    pub fn is_expired(&self, token: &str) -> bool {
        self.is_expired_at(token, Utc::now().timestamp())
    }

    /// True only for a verified, unexpired token
    pub fn validate(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }

    fn decode_at(&self, token: &str, now: i64) -> Result<Claims, InvalidToken> {
        let claims = self.verify_signature(token)?;
        if claims.is_expired_at(now) {
            return Err(InvalidToken::Expired);
        }
        Ok(claims)
    }

    fn is_expired_at(&self, token: &str, now: i64) -> bool {
        self.verify_signature(token)
            .map(|claims| claims.is_expired_at(now))
            .unwrap_or(true)
    }

    fn verify_signature(&self, token: &str) -> Result<Claims, InvalidToken> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::from_secs(3600)).unwrap()
    }

    fn claims_expiring_at(exp: i64) -> Claims {
        Claims {
            sub: "alice".to_string(),
            role: Role::Customer,
            user_id: 42,
            iat: exp - 3600,
            exp,
        }
    }

    #[test]
    fn test_short_secret_is_rejected() {
        assert!(TokenCodec::new("too-short", Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_oversized_ttl_fails_encode_instead_of_overflowing() {
        let codec = TokenCodec::new(SECRET, Duration::from_secs(u64::MAX)).unwrap();
        assert!(codec.encode("alice", Role::Customer, 1).is_err());

        let codec = TokenCodec::new(SECRET, Duration::from_secs(i64::MAX as u64)).unwrap();
        assert!(codec.encode("alice", Role::Customer, 1).is_err());
    }

    #[test]
    fn test_encode_then_decode() {
        let codec = codec();
        let token = codec.encode("alice", Role::Restaurant, 7).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Restaurant);
        assert_eq!(claims.user_id, 7);
        assert!(codec.validate(&token));
        assert!(!codec.is_expired(&token));
    }

    #[test]
    fn test_wrong_secret_fails_signature() {
        let other = TokenCodec::new("another-secret-that-is-also-long-enough", Duration::from_secs(60)).unwrap();
        let token = other.encode("mallory", Role::Restaurant, 1).unwrap();

        let codec = codec();
        assert_eq!(codec.decode(&token), Err(InvalidToken::Signature));
        assert!(codec.is_expired(&token));
        assert!(!codec.validate(&token));
    }

    #[test]
    fn test_garbage_is_malformed_and_treated_as_expired() {
        let codec = codec();
        assert!(matches!(codec.decode("not.a.jwt"), Err(InvalidToken::Malformed(_))));
        assert!(matches!(codec.decode(""), Err(InvalidToken::Malformed(_))));
        assert!(codec.is_expired("not.a.jwt"));
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let codec = codec();
        let now = 1_700_000_000;

        let token = codec.encode_claims(&claims_expiring_at(now)).unwrap();
        assert_eq!(codec.decode_at(&token, now), Err(InvalidToken::Expired));
        assert!(codec.is_expired_at(&token, now));

        let token = codec.encode_claims(&claims_expiring_at(now + 1)).unwrap();
        assert!(codec.decode_at(&token, now).is_ok());
        assert!(!codec.is_expired_at(&token, now));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let codec = codec();
        let token = codec
            .encode_claims(&claims_expiring_at(Utc::now().timestamp() - 10))
            .unwrap();

        assert_eq!(codec.decode(&token), Err(InvalidToken::Expired));
        assert!(codec.is_expired(&token));
        assert!(!codec.validate(&token));
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        #[derive(Serialize)]
        struct AdminClaims {
            sub: String,
            role: String,
            #[serde(rename = "userId")]
            user_id: i64,
            exp: i64,
        }

        let claims = AdminClaims {
            sub: "root".to_string(),
            role: "ADMIN".to_string(),
            user_id: 1,
            exp: Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec().decode(&token), Err(InvalidToken::Malformed(_))));
    }

    #[test]
    fn test_hs512_tokens_from_the_auth_service_are_accepted() {
        let claims = claims_expiring_at(Utc::now().timestamp() + 600);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_validate_agrees_with_decode_and_expiry() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let tokens = vec![
            codec.encode("bob", Role::Customer, 3).unwrap(),
            codec.encode_claims(&claims_expiring_at(now - 1)).unwrap(),
            "garbage".to_string(),
        ];

        for token in tokens {
            assert_eq!(
                codec.validate(&token),
                codec.decode(&token).is_ok() && !codec.is_expired(&token)
            );
        }
    }
}
