//! Login endpoint issuing bearer tokens

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::AppState;

use super::{ApiError, reject};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Token prefixed with the "Bearer " scheme, ready for the header.
    pub token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Exchange credentials for an access token
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let issued = state
        .auth
        .login(&req.email, &req.password)
        .await
        .map_err(reject)?;

    Ok(Json(LoginResponse {
        token: format!("Bearer {}", issued.access_token),
        expires_in: issued.expires_in,
        token_type: issued.token_type,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}
