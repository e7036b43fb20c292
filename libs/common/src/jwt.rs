//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256-signed JWTs carrying the user id,
//! email, a token type and a unique `jti`. Both share one signing secret,
//! configured in a single place ([`JwtConfig::from_env`]), and differ only by
//! lifetime and type claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::duration::duration_ms_from_env;

/// Signing secret used when `JWT_SECRET` is not set.
const DEV_SECRET: &str = "pomo-focus-development-secret";

/// Default access token lifetime: 15 minutes
const DEFAULT_ACCESS_EXPIRY_MS: i64 = 15 * 60 * 1000;
/// Default refresh token lifetime: 7 days
const DEFAULT_REFRESH_EXPIRY_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Token verification and signing failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature does not match the payload
    #[error("invalid token signature")]
    InvalidSignature,

    /// The `exp` claim is in the past
    #[error("token has expired")]
    Expired,

    /// Not a decodable JWT
    #[error("malformed token")]
    Malformed,

    /// A valid token of the other type (access vs refresh)
    #[error("unexpected token type")]
    WrongType,

    /// The token could not be encoded
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret for signing and verifying tokens
    pub secret: String,
    /// Access token lifetime in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret (a development fallback is used if unset)
    /// - `JWT_EXPIRES_IN`: Access token lifetime as a duration string (default: `15m`)
    /// - `JWT_REFRESH_EXPIRES_IN`: Refresh token lifetime as a duration string (default: `7d`)
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET is not set, falling back to the development secret");
                DEV_SECRET.to_string()
            }
        };

        let access_ms = duration_ms_from_env("JWT_EXPIRES_IN", DEFAULT_ACCESS_EXPIRY_MS);
        let refresh_ms = duration_ms_from_env("JWT_REFRESH_EXPIRES_IN", DEFAULT_REFRESH_EXPIRY_MS);

        JwtConfig {
            secret,
            access_token_expiry: ms_to_secs(access_ms, DEFAULT_ACCESS_EXPIRY_MS),
            refresh_token_expiry: ms_to_secs(refresh_ms, DEFAULT_REFRESH_EXPIRY_MS),
        }
    }
}

/// Whole seconds, never below one; non-positive input uses the fallback
fn ms_to_secs(ms: i64, fallback_ms: i64) -> u64 {
    let ms = if ms > 0 { ms } else { fallback_ms };
    (ms as u64 / 1000).max(1)
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Unique token id, so two tokens minted in the same second differ
    pub jti: String,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        JwtService {
            encoding_key,
            decoding_key,
            validation: validation(),
            config,
        }
    }

    /// Sign a token of the given type that expires after `ttl`
    pub fn sign(
        &self,
        user_id: Uuid,
        email: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.sign(
            user_id,
            email,
            TokenType::Access,
            Duration::seconds(self.config.access_token_expiry as i64),
        )
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.sign(
            user_id,
            email,
            TokenType::Refresh,
            Duration::seconds(self.config.refresh_token_expiry as i64),
        )
    }

    /// Generate a fresh access/refresh pair
    pub fn generate_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user_id, email)?,
            refresh_token: self.generate_refresh_token(user_id, email)?,
        })
    }

    /// Validate a token's signature and expiry and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token and require it to be of `expected` type
    pub fn validate_typed(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    /// Get the access token expiry time in seconds
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time in seconds
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

/// SHA-256 fingerprint of a token, hex-encoded
///
/// This is the value kept in the token store instead of the raw token.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
