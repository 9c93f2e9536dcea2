// Public API - what other modules can use
pub use events::{BroadcastEventPublisher, SessionEvent, SessionEventPublisher};
pub use handlers::auth_routes;
pub use middleware::jwt_auth;
pub use service::SessionService;
pub use token::{IssuedToken, TokenIssuer};
pub use types::{SessionResponse, TokenClaims, TokenKind};

// Internal modules
pub mod events;
mod handlers;
mod middleware;
pub mod models;
pub mod repository;
pub mod service;
pub mod sweep;
mod token;
pub mod types;
