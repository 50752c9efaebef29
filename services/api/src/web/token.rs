//! services/api/src/web/token.rs
//!
//! Bearer-token handling. Tokens are HS256-signed claims carrying the user id
//! and email with a fixed 7-day expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed token lifetime.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// The signed claims inside a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (user id).
    pub sub: Uuid,
    pub email: String,
    /// Issued at (timestamp).
    pub iat: i64,
    /// Expiration time (timestamp).
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user_id: Uuid, email: String) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(TOKEN_TTL_DAYS);
        Self {
            sub: user_id,
            email,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid token")]
    Invalid,
}

pub fn encode_token(secret: &[u8], claims: &TokenClaims) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    Ok(encode(&header, claims, &EncodingKey::from_secret(secret))?)
}

pub fn decode_token(secret: &[u8], token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| TokenError::Invalid)?;
    Ok(data.claims)
}
