//! User registration and lookup endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::db::{CatalogError, UserRecord};

use super::{ApiError, authorize, reject};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// User as returned by the API. The numeric id stays internal; callers see
/// the uuid only.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uuid: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            uuid: user.uuid,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Register a new user account
async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state
        .auth
        .register(&req.email, &req.password)
        .await
        .map_err(reject)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully",
        }),
    ))
}

/// Fetch a user by email
async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(&state, &headers)?;

    match state.db.users().get_by_email(&email).await.map_err(reject)? {
        Some(user) => Ok(Json(user.into())),
        None => Err(reject(CatalogError::NotFound("user"))),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/{email}", get(get_user))
}
