//! Download tokens: generation, expiry and client binding

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::path::PathBuf;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// A single-use credential for one resolved file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadToken {
    /// Opaque token value handed to the client
    pub token: String,
    /// Canonical path inside the file root
    pub resolved_path: PathBuf,
    /// Token is dead at or after this instant
    pub expires_at: DateTime<Utc>,
    /// SHA-256 of the issuing client's address, if binding is enabled
    pub client_binding: Option<String>,
}

impl DownloadToken {
    /// Mint a fresh token for `resolved_path`
    ///
    /// # Arguments
    /// * `resolved_path` - Canonical path the token authorizes
    /// * `ttl` - Lifetime of the token
    /// * `client_binding` - Hash of the issuing client's address
    /// * `now` - Issuance time
    pub fn issue(
        resolved_path: PathBuf,
        ttl: Duration,
        client_binding: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token: generate_download_token(),
            resolved_path,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            client_binding,
        }
    }

    /// Whether the token is past its lifetime at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Reasons a presented download token is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unknown download token")]
    InvalidToken,
    #[error("download token expired")]
    TokenExpired,
    #[error("download token presented by a different client")]
    ClientMismatch,
}

/// Generate a random, URL-safe token
///
/// # Returns
/// * 64-character hexadecimal token
pub fn generate_download_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way hash of a client address used for token binding
pub fn hash_client_address(addr: &IpAddr) -> String {
    let mut hasher = Sha256::new();
    hasher.update(addr.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
