//! HTTP file share with single-use download tokens
//!
//! This crate serves a directory tree to logged-in users. Files are fetched
//! through short-lived, client-bound download tokens, and downloads honor
//! HTTP range requests so media can be streamed and seeked.

mod auth;
mod config;
mod error;
mod listing;
mod path;
mod range;
mod server;
mod state;
mod store;
mod stream;
mod token;

pub use auth::{AuthenticatedUser, LoginForm, LoginResponse};
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use listing::{list_directory, FileInfo, ListQuery};
pub use path::{resolve_within_root, PathError};
pub use range::{ByteRange, RangeError};
pub use server::{DownloadTokenResponse, FileServerApi};
pub use state::ServerState;
pub use store::{MemoryTokenStore, TokenStore};
pub use stream::{open_range_stream, serve_file, RangeStream, CHUNK_SIZE};
pub use token::{generate_download_token, hash_client_address, DownloadToken, TokenError};

/// Result type alias for file server operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
