//! Pomodoro API service
//!
//! Authenticated CRUD, lifecycle actions, listing and statistics for
//! pomodoro sessions.

pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, PomodoroError};
pub use routes::create_router;
pub use service::PomodoroService;
pub use state::AppState;
