//! HTTP routes for listing, token issuance and downloads

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{login, AuthenticatedUser};
use crate::error::{ApiError, ApiResult};
use crate::listing::{list_directory, FileInfo, ListQuery};
use crate::state::ServerState;
use crate::stream::serve_file;
use crate::token::TokenError;

/// File server API for managing the HTTP server
#[derive(Clone)]
pub struct FileServerApi {
    state: ServerState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadTokenResponse {
    pub token: String,
}

/// Shortest allowed interval between expired-token sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
}

impl FileServerApi {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// Get the server state
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Create the axum router with all routes configured
    pub fn router(&self) -> Router {
        Router::new()
            .route("/login", post(login))
            .route("/files", get(list_files))
            .route("/download-token/*path", post(issue_download_token))
            .route("/download/*path", get(download_file))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the file server
    ///
    /// # Arguments
    /// * `host` - Host to bind to (e.g., "0.0.0.0")
    /// * `port` - Port to bind to (e.g., 8000)
    /// * `sweep_interval` - How often expired download tokens are purged (at least one second)
    /// * `shutdown` - Resolves when the server should stop
    pub async fn serve<F>(
        self,
        host: &str,
        port: u16,
        sweep_interval: Duration,
        shutdown: F,
    ) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("File server listening on {}", addr);

        let cleanup_state = self.state.clone();
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_period(sweep_interval));
            loop {
                interval.tick().await;
                let cleaned = cleanup_state.cleanup_expired_tokens();
                if cleaned > 0 {
                    tracing::info!("Cleaned up {} expired download tokens", cleaned);
                }
            }
        });

        let result = axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        sweeper.abort();
        result?;

        tracing::info!("File server stopped");
        Ok(())
    }
}

fn sweep_period(requested: Duration) -> Duration {
    requested.max(MIN_SWEEP_INTERVAL)
}

/// Health check endpoint
async fn health_check(State(state): State<ServerState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("File server running. Active download tokens: {}", state.token_count()),
    )
}

/// `GET /files`
async fn list_files(
    AuthenticatedUser(_user): AuthenticatedUser,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<FileInfo>>> {
    let dir = state
        .resolve(&query.path)
        .map_err(|_| ApiError::NotFound("Directory not found"))?;

    let is_dir = tokio::fs::metadata(&dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(ApiError::NotFound("Directory not found"));
    }

    let files = list_directory(&dir, &query)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to list {}: {}", dir.display(), e)))?;

    Ok(Json(files))
}

/// `POST /download-token/{path}`
async fn issue_download_token(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<ServerState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(path): Path<String>,
) -> ApiResult<Json<DownloadTokenResponse>> {
    tracing::debug!("User '{}' requested a download token for {:?}", user, path);
    let token = state.issue_download_token(&path, client.ip()).await?;
    Ok(Json(DownloadTokenResponse { token }))
}

/// `GET /download/{path}?token=...`
///
/// The token is the only credential; no session is required.
async fn download_file(
    State(state): State<ServerState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(path): Path<String>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::TokenRequired)?;

    let authorized = state.redeem_download_token(&token, client.ip())?;

    // The URL path must name the same file the token was issued for
    match state.resolve(&path) {
        Ok(requested) if requested == authorized => {}
        _ => return Err(TokenError::InvalidToken.into()),
    }

    tracing::info!("Serving download of {:?}", path);
    serve_file(&authorized, headers.get(header::RANGE)).await
}
