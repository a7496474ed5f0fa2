//! Session authentication for protected endpoints

use axum::{
    async_trait,
    extract::{rejection::FormRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

/// Login form (`application/x-www-form-urlencoded`)
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

/// The user behind a valid `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
impl FromRequestParts<ServerState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthenticated("Not authenticated"))?;

        match state.accounts().resolve_session(token.trim()).await? {
            Some(username) => Ok(AuthenticatedUser(username)),
            None => Err(ApiError::Unauthenticated("Invalid token")),
        }
    }
}

/// `POST /login`
pub async fn login(
    State(state): State<ServerState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Form(form) = form.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let token = state
        .accounts()
        .login(&form.username, &form.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    tracing::info!("User '{}' logged in", form.username);

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}
