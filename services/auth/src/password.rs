//! Password hashing
//!
//! Argon2id with a tunable time cost. Hashing and verification are CPU-bound
//! and run on the blocking pool so request tasks keep making progress.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};

use crate::error::{AuthError, AuthResult};

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Argon2 time cost (iterations)
    pub time_cost: u32,
    /// Argon2 memory cost in KiB
    pub memory_cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            time_cost: Params::DEFAULT_T_COST,
            memory_cost: Params::DEFAULT_M_COST,
        }
    }
}

impl PasswordConfig {
    /// Create a new PasswordConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PASSWORD_HASH_COST`: Argon2 time cost (default: 2)
    pub fn from_env() -> Self {
        let time_cost = std::env::var("PASSWORD_HASH_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|cost| *cost >= 1)
            .unwrap_or(Params::DEFAULT_T_COST);

        Self {
            time_cost,
            ..Self::default()
        }
    }
}

/// Salted one-way password hashing
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    /// Hash of a random secret, compared against when no user matches so the
    /// unknown-email path costs the same as a wrong password
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(config: &PasswordConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_cost, config.time_cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let dummy_secret = SaltString::generate(&mut rand::thread_rng());
        let dummy_hash = hash_blocking(&params, dummy_secret.as_str())?;

        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Hash a plaintext password into a PHC string
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let params = self.params.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&params, &password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Constant-time comparison of a password against a stored hash
    ///
    /// With `None` the dummy hash is checked instead and the result is
    /// always `false`.
    pub async fn verify(&self, password: &str, hash: Option<&str>) -> AuthResult<bool> {
        let known = hash.is_some();
        let hash = hash.map(str::to_string).unwrap_or_else(|| self.dummy_hash.to_string());
        let password = password.to_string();

        let matches = tokio::task::spawn_blocking(move || verify_blocking(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;

        Ok(known && matches)
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_blocking(params: &Params, password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    argon2(params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

fn verify_blocking(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    // Parameters are read from the PHC string itself
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
