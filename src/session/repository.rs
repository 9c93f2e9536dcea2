use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::RefreshTokenModel;
use crate::shared::{is_unique_violation, AppError};

/// Trait for refresh token persistence
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Fails with `TokenCollision` if the token string already exists
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenModel, AppError>;

    /// Absent, expired and revoked records are all reported as `None`
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError>;

    /// Sets `revoked_at` only if it is unset; `NotFound` when nothing matched
    async fn revoke_by_token(&self, token: &str) -> Result<(), AppError>;

    /// Returns how many outstanding tokens were revoked
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Removes expired or revoked records; returns how many were removed
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

/// In-memory implementation of RefreshTokenRepository for development and testing
///
/// Records are keyed by token string. Every operation runs under a single lock,
/// which gives the same check-and-set guarantees the database gets from its
/// unique index and conditional updates.
pub struct InMemoryRefreshTokenRepository {
    tokens: Mutex<HashMap<String, RefreshTokenModel>>,
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRefreshTokenRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated records
    pub fn with_records(records: Vec<RefreshTokenModel>) -> Self {
        let tokens = records
            .into_iter()
            .map(|record| (record.token.clone(), record))
            .collect();

        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// Returns the current number of records, usable or not
    pub fn record_count(&self) -> usize {
        self.lock().len()
    }

    /// Raw record lookup that ignores expiry and revocation
    pub fn find_record(&self, token: &str) -> Option<RefreshTokenModel> {
        self.lock().get(token).cloned()
    }

    /// Overrides a record's expiry, for exercising expiry paths
    pub fn set_expires_at(&self, token: &str, expires_at: DateTime<Utc>) -> bool {
        match self.lock().get_mut(token) {
            Some(record) => {
                record.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RefreshTokenModel>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    #[instrument(skip(self, token, expires_at))]
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenModel, AppError> {
        let mut tokens = self.lock();
        if tokens.contains_key(token) {
            warn!("Refresh token already exists in memory");
            return Err(AppError::TokenCollision);
        }

        let record = RefreshTokenModel::new(user_id, token.to_string(), expires_at);
        tokens.insert(record.token.clone(), record.clone());

        debug!(token_record_id = %record.id, "Refresh token stored in memory");
        Ok(record)
    }

    #[instrument(skip(self, token))]
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        let record = self
            .lock()
            .get(token)
            .filter(|record| record.is_usable())
            .cloned();

        match &record {
            Some(r) => debug!(token_record_id = %r.id, "Usable refresh token found in memory"),
            None => debug!("No usable refresh token found in memory"),
        }

        Ok(record)
    }

    #[instrument(skip(self, token))]
    async fn revoke_by_token(&self, token: &str) -> Result<(), AppError> {
        let mut tokens = self.lock();
        match tokens.get_mut(token) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(Utc::now());
                debug!(token_record_id = %record.id, "Refresh token revoked in memory");
                Ok(())
            }
            _ => {
                warn!("Refresh token unknown or already revoked");
                Err(AppError::NotFound(
                    "Refresh token not found or already revoked".to_string(),
                ))
            }
        }
    }

    #[instrument(skip(self))]
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut revoked = 0;

        for record in self.lock().values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }

        debug!(revoked_tokens = revoked, "Revoked all refresh tokens for user in memory");
        Ok(revoked)
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, AppError> {
        let mut tokens = self.lock();
        let initial_count = tokens.len();

        tokens.retain(|_, record| record.is_usable());

        let removed_count = initial_count - tokens.len();
        debug!(
            removed_tokens = removed_count,
            "Expired and revoked refresh tokens removed from memory"
        );
        Ok(removed_count as u64)
    }
}

/// PostgreSQL implementation of refresh token repository
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    #[instrument(skip(self, token, expires_at))]
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenModel, AppError> {
        let record = RefreshTokenModel::new(user_id, token.to_string(), expires_at);

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at, revoked_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!("Refresh token already exists in database");
                AppError::TokenCollision
            } else {
                warn!(error = %e, "Failed to store refresh token in database");
                AppError::from(e)
            }
        })?;

        debug!(token_record_id = %record.id, "Refresh token stored in database");
        Ok(record)
    }

    #[instrument(skip(self, token))]
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenModel>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at FROM refresh_tokens \
             WHERE token = $1 AND revoked_at IS NULL AND expires_at > $2",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch refresh token from database");
            AppError::from(e)
        })?;

        match &record {
            Some(r) => debug!(token_record_id = %r.id, "Usable refresh token found in database"),
            None => debug!("No usable refresh token found in database"),
        }

        Ok(record)
    }

    #[instrument(skip(self, token))]
    async fn revoke_by_token(&self, token: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE token = $1 AND revoked_at IS NULL",
        )
        .bind(token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to revoke refresh token in database");
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            warn!("Refresh token unknown or already revoked");
            return Err(AppError::NotFound(
                "Refresh token not found or already revoked".to_string(),
            ));
        }

        debug!("Refresh token revoked in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to revoke refresh tokens for user");
            AppError::from(e)
        })?;

        let revoked = result.rows_affected();
        debug!(revoked_tokens = revoked, "Revoked all refresh tokens for user in database");
        Ok(revoked)
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE expires_at <= $1 OR revoked_at IS NOT NULL",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to delete expired refresh tokens");
            AppError::from(e)
        })?;

        let rows_affected = result.rows_affected();
        debug!(
            removed_tokens = rows_affected,
            "Expired and revoked refresh tokens removed from database"
        );
        Ok(rows_affected)
    }
}
