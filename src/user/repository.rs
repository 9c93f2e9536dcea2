use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::UserModel;
use crate::shared::{is_unique_violation, AppError};

/// Trait for user record operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DuplicateUser` if the username or email is taken
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;

    /// Exact match on username or email; a username match wins
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError>;
    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, UserModel>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(username = %user.username, "Creating user in memory");

        let mut users = self.lock();
        let taken = users.values().any(|existing| {
            existing.id == user.id
                || existing.username == user.username
                || existing.email == user.email
        });
        if taken {
            warn!(username = %user.username, "Username or email already registered");
            return Err(AppError::DuplicateUser);
        }
        users.insert(user.id, user.clone());

        debug!("User created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.lock();
        let user = users
            .values()
            .find(|u| u.username == identifier)
            .or_else(|| users.values().find(|u| u.email == identifier))
            .cloned();

        debug!(found = user.is_some(), "Looked up user by identifier in memory");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        Ok(self.lock().get(&user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut users = self.lock();
        let user = users.get_mut(&user_id).ok_or_else(|| {
            warn!("User not found for last-login update in memory");
            AppError::UserNotFound
        })?;
        user.last_login_at = Some(at);
        user.updated_at = at;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut users = self.lock();
        let user = users.get_mut(&user_id).ok_or_else(|| {
            warn!("User not found for email verification in memory");
            AppError::UserNotFound
        })?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        Ok(())
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, name, email_verified, active, \
                            last_login_at, created_at, updated_at";

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(username = %user.username, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, name, email_verified, active, last_login_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.email_verified)
        .bind(user.active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(username = %user.username, "Username or email already registered");
                AppError::DuplicateUser
            } else {
                warn!(error = %e, "Failed to create user in database");
                AppError::from(e)
            }
        })?;

        debug!("User created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        let user = sqlx::query_as::<_, UserModel>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to look up user by identifier");
                AppError::from(e)
            })?;

        debug!(found = user.is_some(), "Looked up user by identifier in database");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserModel>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch user from database");
                AppError::from(e)
            })
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
                .bind(user_id)
                .bind(at)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to update last login");
                    AppError::from(e)
                })?;

        if result.rows_affected() == 0 {
            warn!("User not found for last-login update");
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_email_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = $2 WHERE id = $1")
                .bind(user_id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to mark email verified");
                    AppError::from(e)
                })?;

        if result.rows_affected() == 0 {
            warn!("User not found for email verification");
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }
}
