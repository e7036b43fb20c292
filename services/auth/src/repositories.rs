//! Repositories for database operations

pub mod user;

pub use user::{EMAIL_UNIQUE_CONSTRAINT, UserRepository, UserStore};
