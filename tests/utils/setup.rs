use chrono::Duration;
use std::sync::Arc;

use media_identity::{
    AuthConfig, BcryptPasswordHasher, InMemoryRefreshTokenRepository, InMemoryUserRepository,
    SessionEventPublisher, SessionService, UserProfile,
};

pub const PASSWORD: &str = "Passw0rd!";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub service: Arc<SessionService>,
    pub users: Arc<InMemoryUserRepository>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
}

impl TestSetup {
    /// Registers an account and marks its email verified
    pub async fn verified_user(&self, username: &str, email: &str) -> UserProfile {
        let user = self
            .service
            .register(username, email, PASSWORD, "Test User")
            .await
            .unwrap();
        self.service.verify_email(user.id).await.unwrap();
        user
    }
}

pub struct TestSetupBuilder {
    config: AuthConfig,
    publisher: Option<Arc<dyn SessionEventPublisher>>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: AuthConfig::new(
                "integration-test-secret",
                Duration::minutes(15),
                Duration::days(30),
            )
            .with_bcrypt_cost(BcryptPasswordHasher::MIN_COST),
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn SessionEventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> TestSetup {
        let users = Arc::new(InMemoryUserRepository::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());

        let mut service = SessionService::new(
            &self.config,
            users.clone(),
            refresh_tokens.clone(),
            Arc::new(BcryptPasswordHasher::new(self.config.bcrypt_cost)),
        );
        if let Some(publisher) = self.publisher {
            service = service.with_event_publisher(publisher);
        }

        TestSetup {
            service: Arc::new(service),
            users,
            refresh_tokens,
        }
    }
}
