//! Authentication service
//!
//! Registration and login, refresh-token rotation and revocation, one-time
//! codes delivered by email, and user administration.

pub mod cookies;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod otp;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod validation;

pub use error::{AuthError, OtpError};
pub use routes::create_router;
pub use service::AuthService;
pub use state::AppState;
