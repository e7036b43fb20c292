//! Token cookies
//!
//! Both tokens travel as `httpOnly` cookies next to the JSON body. In
//! production cookies are `Secure` and `SameSite=Strict`, otherwise `Lax`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use pomo_common::{
    TokenPair,
    web::{ACCESS_COOKIE, REFRESH_COOKIE},
};

/// Default access cookie lifetime: 1 hour
const DEFAULT_ACCESS_MAX_AGE_MS: i64 = 60 * 60 * 1000;
/// Default refresh cookie lifetime: 7 days
const DEFAULT_REFRESH_MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Whether the service runs in production
    pub production: bool,
    /// Access cookie max-age in milliseconds
    pub access_max_age_ms: i64,
    /// Refresh cookie max-age in milliseconds
    pub refresh_max_age_ms: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            production: false,
            access_max_age_ms: DEFAULT_ACCESS_MAX_AGE_MS,
            refresh_max_age_ms: DEFAULT_REFRESH_MAX_AGE_MS,
        }
    }
}

impl CookieConfig {
    /// Create a new CookieConfig from environment variables
    ///
    /// # Environment Variables
    /// - `APP_ENV` (or `NODE_ENV`): `production` enables secure cookies
    /// - `ACCESS_COOKIE_MAX_AGE`: Access cookie max-age in ms (default: 3600000)
    /// - `REFRESH_COOKIE_MAX_AGE`: Refresh cookie max-age in ms (default: 604800000)
    pub fn from_env() -> Self {
        let env = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        Self {
            production: env.eq_ignore_ascii_case("production"),
            access_max_age_ms: max_age_from_env("ACCESS_COOKIE_MAX_AGE", DEFAULT_ACCESS_MAX_AGE_MS),
            refresh_max_age_ms: max_age_from_env(
                "REFRESH_COOKIE_MAX_AGE",
                DEFAULT_REFRESH_MAX_AGE_MS,
            ),
        }
    }

    fn same_site(&self) -> SameSite {
        if self.production {
            SameSite::Strict
        } else {
            SameSite::Lax
        }
    }

    fn cookie(&self, name: &'static str, value: String, max_age_ms: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.production)
            .same_site(self.same_site())
            .path("/")
            .max_age(time::Duration::milliseconds(max_age_ms))
            .build()
    }

    /// Add both token cookies to the jar
    pub fn set_tokens(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        jar.add(self.cookie(
            ACCESS_COOKIE,
            tokens.access_token.clone(),
            self.access_max_age_ms,
        ))
        .add(self.cookie(
            REFRESH_COOKIE,
            tokens.refresh_token.clone(),
            self.refresh_max_age_ms,
        ))
    }

    /// Expire both token cookies
    pub fn clear_tokens(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
            .remove(Cookie::build(REFRESH_COOKIE).path("/"))
    }
}

fn max_age_from_env(name: &str, fallback: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|ms: &i64| *ms > 0)
        .unwrap_or(fallback)
}
