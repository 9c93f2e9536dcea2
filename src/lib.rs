// Library crate for the media-sharing identity and session layer
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod password;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use config::AuthConfig;
pub use password::{BcryptPasswordHasher, PasswordHasher, PasswordPolicy, PasswordRule};
pub use session::{
    auth_routes, jwt_auth,
    repository::{
        InMemoryRefreshTokenRepository, PostgresRefreshTokenRepository, RefreshTokenRepository,
    },
    SessionEvent, SessionEventPublisher, SessionResponse, SessionService, TokenClaims, TokenKind,
};
pub use shared::{AppError, AppState};
pub use user::{InMemoryUserRepository, PostgresUserRepository, UserProfile, UserRepository};
