//! Common library for the Pomo Focus backend
//!
//! This crate provides the pieces shared by the auth and api services:
//! PostgreSQL connectivity and migrations, the ephemeral token store
//! (Redis or in-memory), JWT issuance and verification, duration parsing
//! for configuration, and the HTTP envelope/authentication helpers.

pub mod cache;
pub mod database;
pub mod duration;
pub mod error;
pub mod jwt;
pub mod web;

pub use cache::{MemoryStore, RedisConfig, RedisPool, TokenStore};
pub use error::{CacheError, DatabaseError};
pub use jwt::{Claims, JwtConfig, JwtService, TokenError, TokenPair, TokenType};
pub use web::{AuthRejection, AuthUser, DataResponse, ServerConfig};
