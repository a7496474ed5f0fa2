//! Credential store and session tokens for the file share
//!
//! Users live in a SQLite table mapping a username to a salted bcrypt hash.
//! A successful login hands back an opaque bearer token which the server
//! resolves on every authenticated request.

mod error;
mod password;
mod store;

pub use error::{AccountError, AccountResult};
pub use password::{hash_password, verify_password, DEFAULT_COST, MAX_PASSWORD_LENGTH};
pub use store::CredentialStore;

/// Default location of the users database
pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";
