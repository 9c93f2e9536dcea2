// Public API - what other modules can use
pub use hasher::{BcryptPasswordHasher, PasswordHasher};
pub use policy::{PasswordPolicy, PasswordRule};

mod hasher;
mod policy;
