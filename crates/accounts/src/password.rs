//! Salted password hashing
//!
//! bcrypt embeds its own random salt in the hash string, so a stored value
//! is self-contained. Both operations run on the blocking pool.

use crate::error::{AccountError, AccountResult};

/// bcrypt cost used for newly provisioned users
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Longest password bcrypt can tell apart from its prefixes
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password with a fresh salt
pub async fn hash_password(password: &str, cost: u32) -> AccountResult<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| AccountError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AccountError::Hashing(format!("task join error: {}", e)))?
}

/// Check a password against a stored hash
///
/// # Returns
/// * `Ok(true)` if the password matches
/// * `Ok(false)` if it does not
/// * `Err(AccountError::Hashing)` if the stored hash is malformed
pub async fn verify_password(password: &str, hash: &str) -> AccountResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).map_err(|e| AccountError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AccountError::Hashing(format!("task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("hunter2", TEST_COST).await.unwrap();
        assert!(verify_password("hunter2", &hash).await.unwrap());
        assert!(!verify_password("hunter3", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let first = hash_password("same", TEST_COST).await.unwrap();
        let second = hash_password("same", TEST_COST).await.unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("same"));
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        let result = verify_password("anything", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(AccountError::Hashing(_))));
    }
}
