//! Repositories for database operations

pub mod pomodoro;

pub use pomodoro::{ACTIVE_SESSION_CONSTRAINT, PomodoroRepository, PomodoroStore};
