use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    events::{SessionEvent, SessionEventPublisher},
    repository::RefreshTokenRepository,
    token::TokenIssuer,
    types::{SessionResponse, TokenClaims, TOKEN_TYPE_BEARER},
};
use crate::config::AuthConfig;
use crate::password::{PasswordHasher, PasswordPolicy};
use crate::shared::AppError;
use crate::user::{UserModel, UserProfile, UserRepository};

/// Hashed once per service and verified against on unknown identifiers
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-identifiers";

/// Login, refresh, logout and token validation on top of the
/// password hasher, token issuer, refresh token store and user records.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: TokenIssuer,
    password_policy: PasswordPolicy,
    events: Option<Arc<dyn SessionEventPublisher>>,
    dummy_hash: OnceCell<String>,
}

impl SessionService {
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            issuer: TokenIssuer::from_config(config),
            password_policy: config.password_policy.clone(),
            events: None,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn with_event_publisher(mut self, publisher: Arc<dyn SessionEventPublisher>) -> Self {
        self.events = Some(publisher);
        self
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Creates an unverified account after checking the password policy
    #[instrument(skip(self, password, email, name))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, AppError> {
        info!("Registering new user");

        if let Err((rule, message)) = self.password_policy.check(password) {
            warn!(rule = %rule, "Password rejected by policy");
            return Err(AppError::WeakPassword(message));
        }

        let password_hash = self.hash_password(password).await?;
        let user = UserModel::new(
            username.to_string(),
            email.to_string(),
            password_hash,
            name.to_string(),
        );
        self.users.create_user(&user).await?;

        info!(user_id = %user.id, "User registered successfully");
        self.publish(SessionEvent::UserRegistered { user_id: user.id })
            .await;

        Ok(user.profile())
    }

    /// Marks an account's email as verified
    #[instrument(skip(self))]
    pub async fn verify_email(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.set_email_verified(user_id).await?;
        info!(user_id = %user_id, "Email marked as verified");
        Ok(())
    }

    /// Verifies credentials and opens a new session
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<SessionResponse, AppError> {
        info!("Starting login");

        let user = match self.users.find_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                // Same hashing work as a wrong password
                let dummy_hash = self
                    .dummy_hash
                    .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
                    .await?;
                self.verify_password(password, dummy_hash).await?;
                warn!("Login failed: unknown identifier");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !user.email_verified {
            warn!(user_id = %user.id, "Login refused: email not verified");
            return Err(AppError::EmailNotVerified);
        }

        if !self.verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login failed: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let access = self.issuer.generate_access(&user)?;
        let refresh = self.issuer.generate_refresh(&user)?;

        // No refresh token leaves this function without a durable record behind it
        let record = self
            .refresh_tokens
            .create(user.id, &refresh.token, refresh.expires_at)
            .await
            .map_err(|e| {
                warn!(user_id = %user.id, error = %e, "Failed to persist refresh token");
                e
            })?;

        let login_at = Utc::now();
        self.users.update_last_login(user.id, login_at).await?;

        let mut user = user;
        user.last_login_at = Some(login_at);
        user.updated_at = login_at;

        info!(
            user_id = %user.id,
            token_record_id = %record.id,
            "Login completed successfully"
        );
        self.publish(SessionEvent::LoggedIn {
            user_id: user.id,
            token_id: refresh.claims.jti,
        })
        .await;

        Ok(self.session_response(&user, access.token, refresh.token))
    }

    /// Issues a new access token; the refresh token itself is not rotated
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionResponse, AppError> {
        let claims = self.issuer.validate_refresh(refresh_token)?;

        let user = self.users.get_user(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "Refresh failed: user no longer exists");
            AppError::UserNotFound
        })?;

        match self.refresh_tokens.get_by_token(refresh_token).await? {
            Some(record) if record.user_id == user.id => {}
            _ => {
                warn!(user_id = %user.id, "Refresh failed: token not found or revoked");
                return Err(AppError::TokenNotFoundOrRevoked);
            }
        }

        let access = self.issuer.generate_access(&user)?;

        info!(user_id = %user.id, "Access token refreshed");
        Ok(self.session_response(&user, access.token, refresh_token.to_string()))
    }

    /// Revokes one refresh token belonging to `user_id`
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        let claims = self.issuer.validate_refresh(refresh_token)?;

        if claims.sub != user_id {
            warn!(
                user_id = %user_id,
                token_subject = %claims.sub,
                "Logout refused: token belongs to another user"
            );
            return Err(AppError::PermissionDenied);
        }

        self.refresh_tokens.revoke_by_token(refresh_token).await?;

        info!(user_id = %user_id, "Logged out");
        self.publish(SessionEvent::LoggedOut { user_id }).await;
        Ok(())
    }

    /// Revokes every outstanding refresh token for a user
    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.refresh_tokens.revoke_all_for_user(user_id).await?;

        info!(user_id = %user_id, revoked_tokens = revoked, "Logged out of all sessions");
        if revoked > 0 {
            self.publish(SessionEvent::LoggedOut { user_id }).await;
        }
        Ok(revoked)
    }

    /// Authenticates an inbound bearer token
    ///
    /// Access tokens are checked cryptographically only. A refresh token used as
    /// a bearer credential must also still have a live record in the store.
    #[instrument(skip(self, token))]
    pub async fn validate_token(&self, token: &str) -> Result<TokenClaims, AppError> {
        if let Ok(claims) = self.issuer.validate_access(token) {
            return Ok(claims);
        }

        let claims = self.issuer.validate_refresh(token)?;
        match self.refresh_tokens.get_by_token(token).await? {
            Some(record) if record.user_id == claims.sub => Ok(claims),
            _ => {
                warn!(user_id = %claims.sub, "Bearer refresh token is revoked or expired");
                Err(AppError::InvalidToken)
            }
        }
    }

    /// Removes expired and revoked refresh tokens
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        let removed = self.refresh_tokens.delete_expired().await?;
        info!(removed_tokens = removed, "Refresh token sweep completed");
        Ok(removed)
    }

    fn session_response(
        &self,
        user: &UserModel,
        access_token: String,
        refresh_token: String,
    ) -> SessionResponse {
        SessionResponse {
            user: user.profile(),
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.issuer.access_ttl().num_seconds(),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                warn!(error = %e, "Password hashing task failed");
                AppError::Internal
            })?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                warn!(error = %e, "Password verification task failed");
                AppError::Internal
            })
    }

    async fn publish(&self, event: SessionEvent) {
        if let Some(publisher) = &self.events {
            if let Err(e) = publisher.publish(event).await {
                warn!(error = %e, "Failed to publish session event");
            }
        }
    }
}
