//! Refresh session management
//!
//! One live refresh entry per user, stored under `session:{user_id}` as the
//! SHA-256 fingerprint of the current refresh token. TTL matches the refresh
//! token lifetime.

use pomo_common::{TokenStore, error::CacheResult, jwt::fingerprint};
use tracing::info;
use uuid::Uuid;

/// Session manager for handling user refresh sessions in the token store
#[derive(Clone)]
pub struct SessionManager<S> {
    store: S,
    ttl_seconds: u64,
}

impl<S: TokenStore> SessionManager<S> {
    /// Create a new session manager
    pub fn new(store: S, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    fn key(user_id: Uuid) -> String {
        format!("session:{}", user_id)
    }

    /// Store `refresh_token` as the user's only valid refresh token
    pub async fn create_session(&self, user_id: Uuid, refresh_token: &str) -> CacheResult<()> {
        info!("Creating session for user: {}", user_id);
        self.store
            .set(&Self::key(user_id), &fingerprint(refresh_token), self.ttl_seconds)
            .await
    }

    /// Replace `presented` with `next` if `presented` is still the live token
    ///
    /// Returns false when the presented token was already rotated away or
    /// revoked; of two concurrent rotations of the same token only one wins.
    pub async fn rotate_session(
        &self,
        user_id: Uuid,
        presented: &str,
        next: &str,
    ) -> CacheResult<bool> {
        let rotated = self
            .store
            .compare_and_set(
                &Self::key(user_id),
                &fingerprint(presented),
                &fingerprint(next),
                self.ttl_seconds,
            )
            .await?;

        if rotated {
            info!("Rotated session for user: {}", user_id);
        }
        Ok(rotated)
    }

    /// Delete a session for a user; deleting a missing session is fine
    pub async fn delete_session(&self, user_id: Uuid) -> CacheResult<()> {
        info!("Deleting session for user: {}", user_id);
        self.store.delete(&Self::key(user_id)).await
    }
}
