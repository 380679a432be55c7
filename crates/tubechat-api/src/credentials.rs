//! Password hashing and access-token issuance.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;
use uuid::Uuid;

use tubechat_types::api::Claims;

use crate::error::{ApiError, ApiResult};

/// Argon2id with a fresh random salt; the PHC string embeds salt and
/// parameters.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Issues and validates HS256 access tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> ApiResult<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(anyhow::Error::from)?;
        Ok(token)
    }

    /// Fails with `InvalidToken` on a bad signature, malformed input, or
    /// an expired token.
    pub fn validate(&self, token: &str) -> ApiResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                warn!("Rejected access token: {}", e);
                ApiError::InvalidToken
            })?;
        Ok(data.claims.sub)
    }
}
