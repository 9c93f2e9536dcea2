use tracing::{debug, instrument, warn};

use crate::shared::AppError;

/// One-way credential hashing
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// Any failure, including a malformed stored hash, reads as a mismatch
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// bcrypt-backed hasher with a fixed cost factor
#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    /// Lowest cost bcrypt accepts
    pub const MIN_COST: u32 = 4;

    /// Longest input bcrypt hashes in full; its 72-byte buffer includes a NUL terminator
    pub const MAX_PASSWORD_BYTES: usize = 71;

    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    #[instrument(skip_all, fields(cost = self.cost))]
    fn hash(&self, password: &str) -> Result<String, AppError> {
        bcrypt::non_truncating_hash(password, self.cost).map_err(|e| {
            warn!(error = %e, "Failed to hash password");
            AppError::Internal
        })
    }

    #[instrument(skip_all)]
    fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::non_truncating_verify(password, hash) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, "Password verification errored, treating as mismatch");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptPasswordHasher {
        BcryptPasswordHasher::new(BcryptPasswordHasher::MIN_COST)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Passw0rd!").unwrap();

        assert_ne!(hash, "Passw0rd!");
        assert!(hasher.verify("Passw0rd!", &hash));
        assert!(!hasher.verify("passw0rd!", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("Passw0rd!").unwrap();
        let second = hasher.hash("Passw0rd!").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_long_passwords_sharing_a_prefix_do_not_collide() {
        let hasher = hasher();
        let prefix = format!("{}xy", "A1!".repeat(23));
        assert_eq!(prefix.len(), BcryptPasswordHasher::MAX_PASSWORD_BYTES);

        // Over the limit hashing is refused instead of silently truncated
        assert!(hasher.hash(&format!("{}Secret", prefix)).is_err());

        let hash = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&prefix, &hash));
        assert!(!hasher.verify(&format!("{}Different", prefix), &hash));
    }

    #[test]
    fn test_verify_against_garbage_hash_is_false() {
        assert!(!hasher().verify("Passw0rd!", "not-a-bcrypt-hash"));
        assert!(!hasher().verify("Passw0rd!", ""));
    }
}
