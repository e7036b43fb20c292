//! Identity service
//!
//! Registration, credential validation and the refresh-session lifecycle:
//! `login` issues a token pair and records the refresh token, `refresh`
//! rotates it, `logout` revokes it.

use pomo_common::{JwtService, TokenPair, TokenStore, TokenType, error::DatabaseError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::{UpdateUser, User},
    password::PasswordService,
    repositories::{EMAIL_UNIQUE_CONSTRAINT, UserStore},
    session::SessionManager,
};

/// Identity service
#[derive(Clone)]
pub struct AuthService<U, S> {
    users: U,
    sessions: SessionManager<S>,
    jwt: JwtService,
    passwords: PasswordService,
}

impl<U: UserStore, S: TokenStore> AuthService<U, S> {
    pub fn new(users: U, store: S, jwt: JwtService, passwords: PasswordService) -> Self {
        let sessions = SessionManager::new(store, jwt.refresh_token_expiry());
        Self {
            users,
            sessions,
            jwt,
            passwords,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Create an account; the stored hash never leaves the service
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.passwords.hash(password).await?;
        let user = self
            .users
            .create(email, &password_hash)
            .await
            .map_err(map_unique_email)?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Look up a user by email and check the password
    ///
    /// Unknown email and wrong password fail identically, and both paths pay
    /// for one hash verification.
    pub async fn validate_credentials(&self, email: &str, password: &str) -> AuthResult<User> {
        let user = self.users.find_by_email(email).await?;
        let hash = user.as_ref().map(|u| u.password_hash.as_str());

        if !self.passwords.verify(password, hash).await? {
            warn!("Rejected credentials for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        user.ok_or(AuthError::InvalidCredentials)
    }

    /// Issue a fresh pair, replacing any previous refresh session
    pub async fn login(&self, user: &User) -> AuthResult<TokenPair> {
        let tokens = self
            .jwt
            .generate_pair(user.id, &user.email)
            .map_err(AuthError::Signing)?;
        self.sessions
            .create_session(user.id, &tokens.refresh_token)
            .await?;

        info!("User {} logged in", user.id);
        Ok(tokens)
    }

    /// Exchange a live refresh token for a new pair
    ///
    /// The presented token is invalid from then on. A token that was already
    /// rotated away, revoked, tampered with or expired is rejected.
    pub async fn refresh(&self, presented: Option<&str>) -> AuthResult<TokenPair> {
        let presented = presented
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self
            .jwt
            .validate_typed(presented, TokenType::Refresh)
            .map_err(|e| {
                warn!("Rejected refresh token: {}", e);
                AuthError::InvalidToken
            })?;

        let tokens = self
            .jwt
            .generate_pair(claims.sub, &claims.email)
            .map_err(AuthError::Signing)?;

        let rotated = self
            .sessions
            .rotate_session(claims.sub, presented, &tokens.refresh_token)
            .await?;
        if !rotated {
            warn!("Refresh token for user {} is not the live session", claims.sub);
            return Err(AuthError::InvalidToken);
        }

        Ok(tokens)
    }

    /// Revoke the user's refresh session; repeated calls are fine
    pub async fn logout(&self, user_id: Uuid) -> AuthResult<()> {
        self.sessions.delete_session(user_id).await?;
        info!("User {} logged out", user_id);
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AuthResult<User> {
        self.find_user(user_id).await
    }

    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    pub async fn find_user(&self, id: Uuid) -> AuthResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply an edit to the caller's own account
    ///
    /// Another user's account reads as absent.
    pub async fn update_user(
        &self,
        caller: Uuid,
        id: Uuid,
        update: &UpdateUser,
    ) -> AuthResult<User> {
        if id != caller {
            warn!("User {} attempted to update user {}", caller, id);
            return Err(AuthError::UserNotFound);
        }
        if update.is_empty() {
            return Err(AuthError::Validation("No fields to update".to_string()));
        }
        if let Some(email) = &update.email {
            let taken = self
                .users
                .find_by_email(email)
                .await?
                .is_some_and(|other| other.id != id);
            if taken {
                return Err(AuthError::DuplicateEmail);
            }
        }

        self.users
            .update(id, update)
            .await
            .map_err(map_unique_email)?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete the caller's own account and revoke its refresh session
    ///
    /// Another user's account reads as absent.
    pub async fn remove_user(&self, caller: Uuid, id: Uuid) -> AuthResult<()> {
        if id != caller {
            warn!("User {} attempted to remove user {}", caller, id);
            return Err(AuthError::UserNotFound);
        }
        if !self.users.delete(id).await? {
            return Err(AuthError::UserNotFound);
        }
        self.sessions.delete_session(id).await?;
        info!("Removed user {}", id);
        Ok(())
    }
}

/// A concurrent writer may claim the email between the check and the write
fn map_unique_email(err: DatabaseError) -> AuthError {
    if err.is_unique_violation(EMAIL_UNIQUE_CONSTRAINT) {
        AuthError::DuplicateEmail
    } else {
        AuthError::Database(err)
    }
}
