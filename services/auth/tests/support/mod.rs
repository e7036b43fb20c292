#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use pomo_auth::{
    AppState, AuthService,
    cookies::CookieConfig,
    models::{UpdateUser, User},
    notifier::{Notifier, NotifierError},
    otp::{OtpConfig, OtpService},
    password::{PasswordConfig, PasswordService},
    rate_limiter::RateLimiterConfig,
    repositories::{EMAIL_UNIQUE_CONSTRAINT, UserStore},
};
use pomo_common::{
    JwtConfig, JwtService, MemoryStore,
    error::{DatabaseError, DatabaseResult},
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";

/// User store backed by a vector, enforcing email uniqueness like the index
#[derive(Clone, Default)]
pub struct InMemoryUsers {
    users: Arc<Mutex<Vec<User>>>,
}

impl UserStore for InMemoryUsers {
    async fn create(&self, email: &str, password_hash: &str) -> DatabaseResult<User> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueViolation {
                constraint: EMAIL_UNIQUE_CONSTRAINT.to_string(),
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> DatabaseResult<Vec<User>> {
        Ok(self.users.lock().await.clone())
    }

    async fn update(&self, id: Uuid, update: &UpdateUser) -> DatabaseResult<Option<User>> {
        let mut users = self.users.lock().await;
        if let Some(email) = &update.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DatabaseError::UniqueViolation {
                    constraint: EMAIL_UNIQUE_CONSTRAINT.to_string(),
                });
            }
        }

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut users = self.users.lock().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}

/// A sent message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that records messages, or fails every send when `failing`
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Code from the most recent message to `to`
    pub async fn last_code(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().await;
        sent.iter().rev().find(|m| m.to == to).map(|m| {
            m.body
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect()
        })
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        if self.failing {
            return Err(NotifierError::Send("mailbox unavailable".to_string()));
        }
        self.sent.lock().await.push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub fn jwt() -> JwtService {
    JwtService::new(JwtConfig {
        secret: SECRET.to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604_800,
    })
}

pub fn passwords() -> PasswordService {
    PasswordService::new(&PasswordConfig {
        time_cost: 1,
        memory_cost: 1024,
    })
    .unwrap()
}

pub fn auth_service(store: MemoryStore) -> AuthService<InMemoryUsers, MemoryStore> {
    AuthService::new(InMemoryUsers::default(), store, jwt(), passwords())
}

pub fn otp_config(ttl_seconds: u64, max_attempts: u32) -> OtpConfig {
    OtpConfig {
        ttl_seconds,
        limiter: RateLimiterConfig {
            max_attempts,
            window_seconds: 300,
            ban_duration_seconds: 300,
        },
    }
}

pub fn app_state(
    notifier: RecordingNotifier,
) -> AppState<InMemoryUsers, MemoryStore, RecordingNotifier> {
    let store = MemoryStore::new();
    AppState::new(
        auth_service(store.clone()),
        OtpService::new(store, notifier, otp_config(300, 5)),
        CookieConfig::default(),
    )
}
