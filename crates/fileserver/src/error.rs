//! API error types and their HTTP mapping

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::range::RangeError;
use crate::token::TokenError;

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed or unknown session token
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Body or query that could not be decoded
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Token required for download")]
    TokenRequired,

    /// All token failures share one message so callers cannot tell them apart
    #[error("Invalid or expired token")]
    DownloadToken(#[from] TokenError),

    #[error("Invalid Range header")]
    RangeNotParseable,

    #[error("Requested Range Not Satisfiable")]
    RangeNotSatisfiable { file_size: u64 },

    #[error("Internal server error")]
    Internal(String),

    #[error("Internal server error")]
    Account(#[from] accounts::AccountError),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) | Self::TokenRequired => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DownloadToken(_) => StatusCode::CONFLICT,
            Self::RangeNotParseable | Self::RangeNotSatisfiable { .. } => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            Self::Internal(_) | Self::Account(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a range failure once the file size is known
    pub fn from_range(err: RangeError, file_size: u64) -> Self {
        match err {
            RangeError::NotParseable => Self::RangeNotParseable,
            RangeError::NotSatisfiable => Self::RangeNotSatisfiable { file_size },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(msg) => tracing::error!("Internal error: {}", msg),
            Self::Account(e) => tracing::error!("Credential store error: {}", e),
            Self::DownloadToken(e) => tracing::info!("Download refused: {}", e),
            _ => {}
        }

        let status = self.status_code();
        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        match self {
            Self::RangeNotSatisfiable { file_size } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", file_size))],
                body,
            )
                .into_response(),
            Self::Unauthenticated(_) => (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
