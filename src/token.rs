use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Principal;

/// Session lifetime: a token stops verifying three days after issuance.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 3;

/// Claims
///
/// The signed payload of a session token. Field names match the wire format
/// clients already hold (`id`, `isAdmin`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account identifier of the token holder.
    pub id: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, tampered payload or an unparseable token.
    #[error("token is not valid")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// TokenService
///
/// Issues and verifies stateless HS256 session tokens. Nothing is stored server
/// side, so a token stays usable until it expires; there is no revocation.
///
/// Built once from the `JWT_SEC` secret at startup and shared through `AppState`.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::days(DEFAULT_TOKEN_TTL_DAYS))
    }

    /// Builds a service whose tokens live for `ttl` instead of the default three days.
    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact: no grace period after `exp`.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// issue
    ///
    /// Signs a token for the given account, expiring `ttl` from now.
    pub fn issue(&self, account_id: &str, is_admin: bool) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id: account_id.to_string(),
            is_admin,
            iat: now.timestamp().max(0) as usize,
            exp: (now + self.ttl).timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// verify
    ///
    /// Checks signature integrity and expiry, returning the identity the token carries.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidToken,
            }
        })?;

        Ok(Principal {
            account_id: data.claims.id,
            is_admin: data.claims.is_admin,
        })
    }
}
