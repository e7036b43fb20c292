//! Application state shared across handlers

use crate::{cookies::CookieConfig, otp::OtpService, service::AuthService};

/// Application state, generic over the user store, token store and notifier
#[derive(Clone)]
pub struct AppState<U, S, N> {
    pub auth: AuthService<U, S>,
    pub otp: OtpService<S, N>,
    pub cookies: CookieConfig,
}

impl<U, S, N> AppState<U, S, N> {
    pub fn new(auth: AuthService<U, S>, otp: OtpService<S, N>, cookies: CookieConfig) -> Self {
        Self { auth, otp, cookies }
    }
}
