//! SQLite-backed credential store
//!
//! The session token handed out on login is the username itself, so a
//! bearer token is valid exactly when it names a provisioned user.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{AccountError, AccountResult};
use crate::password::{hash_password, verify_password, DEFAULT_COST, MAX_PASSWORD_LENGTH};

/// Longest accepted username
const MAX_USERNAME_LEN: usize = 64;

/// Username → password hash store
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
    cost: u32,
}

impl CredentialStore {
    /// Open (and create if missing) the users database
    ///
    /// # Arguments
    /// * `url` - SQLite URL, e.g. `sqlite://users.db`
    pub async fn open(url: &str) -> AccountResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            cost: DEFAULT_COST,
        };
        store.create_table().await?;

        tracing::debug!("Credential store opened at {}", url);
        Ok(store)
    }

    /// Override the bcrypt cost for newly added users
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    async fn create_table(&self) -> AccountResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Provision a new user
    ///
    /// # Errors
    /// * `AccountError::AlreadyExists` if the username is taken
    /// * `AccountError::InvalidUsername` if the name cannot travel in a header
    pub async fn add_user(&self, username: &str, password: &str) -> AccountResult<()> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AccountError::PasswordTooLong(MAX_PASSWORD_LENGTH));
        }

        let hashed = hash_password(password, self.cost).await?;
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(&hashed)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                tracing::info!("User '{}' added", username);
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AccountError::AlreadyExists(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair
    pub async fn verify_credentials(&self, username: &str, password: &str) -> AccountResult<bool> {
        // Longer inputs would be truncated by bcrypt and match on their prefix
        if password.len() > MAX_PASSWORD_LENGTH {
            return Ok(false);
        }

        let stored: Option<String> =
            sqlx::query_scalar("SELECT password FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        match stored {
            Some(hash) => verify_password(password, &hash).await,
            None => Ok(false),
        }
    }

    /// Log a user in
    ///
    /// # Returns
    /// * `Some(token)` - bearer token for subsequent requests
    /// * `None` - unknown user or wrong password
    pub async fn login(&self, username: &str, password: &str) -> AccountResult<Option<String>> {
        if self.verify_credentials(username, password).await? {
            Ok(Some(username.to_string()))
        } else {
            tracing::warn!("Failed login attempt for '{}'", username);
            Ok(None)
        }
    }

    /// Resolve a bearer token to the acting username
    pub async fn resolve_session(&self, token: &str) -> AccountResult<Option<String>> {
        let username: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE username = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(username)
    }

    /// Number of provisioned users
    pub async fn user_count(&self) -> AccountResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn validate_username(username: &str) -> AccountResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AccountError::InvalidUsername(format!(
            "must be 1 to {} bytes long",
            MAX_USERNAME_LEN
        )));
    }
    if !username.chars().all(|c| c.is_ascii_graphic()) {
        return Err(AccountError::InvalidUsername(
            "only printable ASCII without spaces is allowed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (CredentialStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("users.db").display());
        let store = CredentialStore::open(&url).await.unwrap().with_cost(4);
        (store, dir)
    }

    #[tokio::test]
    async fn test_add_and_login() {
        let (store, _dir) = create_test_store().await;
        store.add_user("alice", "wonderland").await.unwrap();

        let token = store.login("alice", "wonderland").await.unwrap();
        assert_eq!(token.as_deref(), Some("alice"));
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (store, _dir) = create_test_store().await;
        store.add_user("alice", "wonderland").await.unwrap();

        assert!(store.login("alice", "looking-glass").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let (store, _dir) = create_test_store().await;
        assert!(store.login("nobody", "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let (store, _dir) = create_test_store().await;
        store.add_user("bob", "one").await.unwrap();

        let result = store.add_user("bob", "two").await;
        assert!(matches!(result, Err(AccountError::AlreadyExists(name)) if name == "bob"));

        // Original password still works
        assert!(store.verify_credentials("bob", "one").await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_session() {
        let (store, _dir) = create_test_store().await;
        store.add_user("carol", "pw").await.unwrap();

        assert_eq!(
            store.resolve_session("carol").await.unwrap().as_deref(),
            Some("carol")
        );
        assert!(store.resolve_session("mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_usernames() {
        let (store, _dir) = create_test_store().await;

        assert!(matches!(
            store.add_user("", "pw").await,
            Err(AccountError::InvalidUsername(_))
        ));
        assert!(matches!(
            store.add_user("with space", "pw").await,
            Err(AccountError::InvalidUsername(_))
        ));
        assert!(matches!(
            store.add_user("dave", "").await,
            Err(AccountError::EmptyPassword)
        ));
    }

    #[tokio::test]
    async fn test_long_password_rejected() {
        let (store, _dir) = create_test_store().await;
        let too_long = "a".repeat(MAX_PASSWORD_LENGTH + 1);

        assert!(matches!(
            store.add_user("frank", &too_long).await,
            Err(AccountError::PasswordTooLong(MAX_PASSWORD_LENGTH))
        ));
        assert_eq!(store.user_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_password_suffix_past_limit_does_not_match() {
        let (store, _dir) = create_test_store().await;
        let prefix = "a".repeat(MAX_PASSWORD_LENGTH);
        store.add_user("alice", &prefix).await.unwrap();

        let forged = format!("{}totally-different", prefix);
        assert!(!store.verify_credentials("alice", &forged).await.unwrap());
        assert!(store.login("alice", &forged).await.unwrap().is_none());
        assert!(store.verify_credentials("alice", &prefix).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("users.db").display());

        {
            let store = CredentialStore::open(&url).await.unwrap().with_cost(4);
            store.add_user("erin", "pw").await.unwrap();
        }

        let reopened = CredentialStore::open(&url).await.unwrap();
        assert!(reopened.verify_credentials("erin", "pw").await.unwrap());
    }
}
