// Public API - what other modules can use
pub use models::{UserModel, UserProfile};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};

pub mod models;
pub mod repository;
