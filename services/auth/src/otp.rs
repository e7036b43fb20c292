//! One-time password workflow
//!
//! Codes are six random digits stored under `otp:{email}` with a TTL. Only
//! the newest code for an email is valid and a code verifies at most once.

use pomo_common::TokenStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{OtpError, OtpResult},
    notifier::Notifier,
    rate_limiter::{RateLimiter, RateLimiterConfig},
};

const DEFAULT_TTL_SECONDS: u64 = 300;

/// OTP configuration
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Code lifetime in seconds
    pub ttl_seconds: u64,
    /// Verification attempt limits per email
    pub limiter: RateLimiterConfig,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            limiter: RateLimiterConfig::default(),
        }
    }
}

impl OtpConfig {
    /// Create a new OtpConfig from environment variables
    ///
    /// # Environment Variables
    /// - `OTP_TTL_SEC`: Code lifetime in seconds (default: 300)
    /// - `OTP_MAX_ATTEMPTS`, `OTP_ATTEMPT_WINDOW_SEC`: see [`RateLimiterConfig::from_env`]
    pub fn from_env() -> Self {
        let ttl_seconds = std::env::var("OTP_TTL_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TTL_SECONDS);

        Self {
            ttl_seconds,
            limiter: RateLimiterConfig::from_env(),
        }
    }
}

/// Acknowledgement of an OTP request; never carries the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSent {
    pub sent: bool,
}

/// Outcome of a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpVerification {
    pub valid: bool,
}

/// Uniformly random code in `100000..=999999`
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// OTP service
#[derive(Clone)]
pub struct OtpService<S, N> {
    store: S,
    notifier: N,
    limiter: RateLimiter,
    ttl_seconds: u64,
}

impl<S: TokenStore, N: Notifier> OtpService<S, N> {
    pub fn new(store: S, notifier: N, config: OtpConfig) -> Self {
        Self {
            store,
            notifier,
            limiter: RateLimiter::new(config.limiter),
            ttl_seconds: config.ttl_seconds,
        }
    }

    fn key(email: &str) -> String {
        format!("otp:{}", email)
    }

    /// Issue a new code for `email`, replacing any unconsumed one, and send it
    pub async fn request_otp(&self, email: &str, reason: &str) -> OtpResult<OtpSent> {
        let key = Self::key(email);
        let code = generate_code();
        self.store.set(&key, &code, self.ttl_seconds).await?;

        let body = format!(
            "Your verification code is {}. It expires in {} minutes.",
            code,
            self.ttl_seconds / 60
        );
        if let Err(e) = self.notifier.send(email, "Your OTP Code", &body).await {
            // A code nobody received must not stay verifiable
            self.store.compare_and_delete(&key, &code).await?;
            warn!("OTP delivery to {} failed: {}", email, e);
            return Err(e.into());
        }

        info!(reason = reason, "OTP issued for {}", email);
        Ok(OtpSent { sent: true })
    }

    /// Check `code` against the live code for `email`, consuming it on a match
    ///
    /// Absent, expired and wrong codes are indistinguishable to the caller.
    pub async fn verify_otp(&self, email: &str, code: &str) -> OtpResult<OtpVerification> {
        if !self.limiter.is_allowed(email).await {
            warn!("OTP verification rate limited for {}", email);
            return Err(OtpError::TooManyAttempts);
        }

        let valid = self.store.compare_and_delete(&Self::key(email), code).await?;
        if valid {
            self.limiter.reset(email).await;
            info!("OTP verified for {}", email);
        } else {
            warn!("OTP verification failed for {}", email);
        }

        Ok(OtpVerification { valid })
    }
}
