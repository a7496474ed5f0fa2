//! In-memory table of live download tokens

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::token::{DownloadToken, TokenError};

/// Storage for issued download tokens
///
/// Implementations must make `take_if_valid` atomic: a token value can be
/// handed out at most once no matter how many callers race for it.
pub trait TokenStore: Send + Sync {
    /// Record a newly issued token
    fn put(&self, token: DownloadToken);

    /// Remove the token and return it if it may be used
    ///
    /// The entry is removed whenever it is found, so a token that fails the
    /// expiry or client check is burned as well.
    ///
    /// # Arguments
    /// * `token` - Presented token value
    /// * `now` - Current time
    /// * `client_binding` - Hash of the presenting client's address
    fn take_if_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
        client_binding: Option<&str>,
    ) -> Result<DownloadToken, TokenError>;

    /// Drop every token expired at `now`, returning how many were removed
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of tokens currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local token table guarded by a mutex
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, DownloadToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn put(&self, token: DownloadToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.insert(token.token.clone(), token);
    }

    fn take_if_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
        client_binding: Option<&str>,
    ) -> Result<DownloadToken, TokenError> {
        let entry = {
            let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
            tokens.remove(token)
        };
        let entry = entry.ok_or(TokenError::InvalidToken)?;

        if entry.is_expired(now) {
            tracing::debug!("Download token expired at {}", entry.expires_at);
            return Err(TokenError::TokenExpired);
        }

        if let Some(expected) = entry.client_binding.as_deref() {
            if client_binding != Some(expected) {
                return Err(TokenError::ClientMismatch);
            }
        }

        Ok(entry)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        let initial_count = tokens.len();
        tokens.retain(|_, entry| !entry.is_expired(now));
        initial_count - tokens.len()
    }

    fn len(&self) -> usize {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.len()
    }
}
