//! Server state and the download token lifecycle

use accounts::CredentialStore;
use chrono::{DateTime, Duration, Utc};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::path::{resolve_within_root, PathError};
use crate::store::{MemoryTokenStore, TokenStore};
use crate::token::{hash_client_address, DownloadToken, TokenError};

/// Server state shared by all request handlers
#[derive(Clone)]
pub struct ServerState {
    /// Live download tokens
    tokens: Arc<dyn TokenStore>,
    /// Users and session tokens
    accounts: CredentialStore,
    /// Canonical directory served to clients
    files_root: PathBuf,
    /// Download token lifetime
    token_ttl: Duration,
    /// Whether tokens are bound to the issuing client's address
    bind_client_ip: bool,
}

impl ServerState {
    /// Create new server state with an in-memory token table
    ///
    /// # Arguments
    /// * `files_root` - Canonical directory served to clients
    /// * `accounts` - Credential store used for logins and bearer tokens
    /// * `token_ttl` - Lifetime of issued download tokens
    pub fn new(files_root: PathBuf, accounts: CredentialStore, token_ttl: std::time::Duration) -> Self {
        Self::with_token_store(files_root, accounts, token_ttl, Arc::new(MemoryTokenStore::new()))
    }

    /// Create server state around a custom token store
    pub fn with_token_store(
        files_root: PathBuf,
        accounts: CredentialStore,
        token_ttl: std::time::Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            tokens,
            accounts,
            files_root,
            token_ttl: Duration::from_std(token_ttl).unwrap_or(Duration::MAX),
            bind_client_ip: true,
        }
    }

    /// Enable or disable binding tokens to the client address
    pub fn bind_client_ip(mut self, enabled: bool) -> Self {
        self.bind_client_ip = enabled;
        self
    }

    pub fn accounts(&self) -> &CredentialStore {
        &self.accounts
    }

    pub fn files_root(&self) -> &Path {
        &self.files_root
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Get count of live download tokens
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Resolve a client path inside the file root
    ///
    /// Paths outside the root are reported as missing.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, PathError> {
        resolve_within_root(&self.files_root, requested).map_err(|e| {
            if e == PathError::OutsideRoot {
                tracing::warn!("Rejected path outside file root: {:?}", requested);
            }
            e
        })
    }

    /// Issue a download token for a regular file under the root
    ///
    /// The caller must already be authenticated.
    ///
    /// # Arguments
    /// * `requested` - Path relative to the file root
    /// * `client` - Address of the requesting client
    ///
    /// # Returns
    /// * `Ok(String)` - Token value
    /// * `Err(ApiError::NotFound)` - Missing file, directory, or path outside the root
    pub async fn issue_download_token(&self, requested: &str, client: IpAddr) -> ApiResult<String> {
        self.issue_download_token_at(requested, client, Utc::now()).await
    }

    pub(crate) async fn issue_download_token_at(
        &self,
        requested: &str,
        client: IpAddr,
        now: DateTime<Utc>,
    ) -> ApiResult<String> {
        let resolved = self
            .resolve(requested)
            .map_err(|_| ApiError::NotFound("File not found"))?;

        let is_file = tokio::fs::metadata(&resolved)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ApiError::NotFound("File not found"));
        }

        let binding = self.bind_client_ip.then(|| hash_client_address(&client));
        let token = DownloadToken::issue(resolved, self.token_ttl, binding, now);
        let value = token.token.clone();

        tracing::info!(
            "Issued download token for {:?}, expires at {}",
            requested,
            token.expires_at
        );
        self.tokens.put(token);

        Ok(value)
    }

    /// Consume a download token, returning the path it authorizes
    ///
    /// The token is burned whenever it is found, whether or not it is valid.
    pub fn redeem_download_token(&self, token: &str, client: IpAddr) -> Result<PathBuf, TokenError> {
        self.redeem_download_token_at(token, client, Utc::now())
    }

    pub(crate) fn redeem_download_token_at(
        &self,
        token: &str,
        client: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, TokenError> {
        let binding = hash_client_address(&client);
        let entry = self.tokens.take_if_valid(token, now, Some(&binding))?;
        Ok(entry.resolved_path)
    }

    /// Remove expired tokens
    ///
    /// # Returns
    /// * Number of tokens removed
    pub fn cleanup_expired_tokens(&self) -> usize {
        self.tokens.purge_expired(Utc::now())
    }
}
