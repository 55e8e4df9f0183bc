//! # JWT access tokens
//!
//! HS256 tokens carrying the user id and role. The role in the token is a
//! snapshot from login time.

use chrono::{Duration, TimeZone, Utc};
use domains::{DomainError, Result, Role, TokenClaims, TokenService, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    iat: i64,
    exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims { sub: user.id, role: user.role, iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            DomainError::NotAuthorized("invalid or expired token".into())
        })?;
        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| DomainError::NotAuthorized("invalid or expired token".into()))?;
        Ok(TokenClaims { user_id: data.claims.sub, role: data.claims.role, expires_at })
    }
}
