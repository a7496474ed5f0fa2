/// Errors raised by the credential store
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A user with this name is already provisioned
    #[error("user '{0}' already exists")]
    AlreadyExists(String),
    /// Username cannot be used as a bearer token
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    /// Empty password
    #[error("password must not be empty")]
    EmptyPassword,
    /// bcrypt only looks at the first 72 bytes
    #[error("password must be at most {0} bytes")]
    PasswordTooLong(usize),
    /// bcrypt failure or a malformed stored hash
    #[error("password hashing failed: {0}")]
    Hashing(String),
    /// SQLite error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for account operations
pub type AccountResult<T> = Result<T, AccountError>;
