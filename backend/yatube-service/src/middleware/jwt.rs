/// Identity tokens issued by the external identity provider
///
/// Tokens are HS256 JWTs carrying the user id in `sub` and the username.
/// The provider and this service share the secret from `JWT_SECRET`.
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub username: String,
}

/// Authenticated caller resolved from a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `user`; used by tooling and tests standing in for
    /// the identity provider.
    pub fn issue(&self, user_id: Uuid, username: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            username: username.to_string(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Token generation failed: {e}"))
    }

    pub fn validate(&self, token: &str) -> Result<AuthUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))?;
        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))?;
        if data.claims.username.trim().is_empty() {
            return Err(anyhow!("Token carries an empty username"));
        }

        Ok(AuthUser {
            id,
            username: data.claims.username,
        })
    }
}
