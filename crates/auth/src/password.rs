//! Password hashing with bcrypt.

use crate::AuthError;

/// Hash a password for storage at the given work factor.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost (4) keeps the tests fast; production runs at 12.
    const COST: u32 = 4;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("hunter2", COST).unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("hunter2", COST).unwrap();
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("hunter2", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("hunter2", COST).unwrap();
        let second = hash_password("hunter2", COST).unwrap();
        assert_ne!(first, second);
    }
}
