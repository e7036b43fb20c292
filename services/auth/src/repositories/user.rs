//! User repository for database operations

use pomo_common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{UpdateUser, User};

/// Name of the unique index guarding `users.email`
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "uq_users_email";

/// Durable credential store
pub trait UserStore: Clone + Send + Sync + 'static {
    /// Insert a user; a taken email surfaces as a unique violation
    fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> impl Future<Output = DatabaseResult<User>> + Send;

    fn find_by_email(&self, email: &str)
    -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    /// All users, oldest first
    fn list(&self) -> impl Future<Output = DatabaseResult<Vec<User>>> + Send;

    /// Apply the present fields and return the updated user, if it exists
    fn update(
        &self,
        id: Uuid,
        update: &UpdateUser,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    /// Remove a user; returns whether a row was deleted
    fn delete(&self, id: Uuid) -> impl Future<Output = DatabaseResult<bool>> + Send;
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for UserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> DatabaseResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(user)
    }

    async fn list(&self) -> DatabaseResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, created_at, updated_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(users)
    }

    async fn update(&self, id: Uuid, update: &UpdateUser) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.email.as_deref())
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
