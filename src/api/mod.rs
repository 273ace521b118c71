//! REST API route definitions
//!
//! Every endpoint speaks JSON and shares one error body shape. Catalog
//! routes require a bearer token; registration, login, and the health
//! probes stay open.

pub mod auth;
pub mod authors;
pub mod books;
pub mod health;
pub mod users;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use serde::Serialize;

use crate::AppState;
use crate::db::CatalogError;
use crate::services::auth::AuthenticatedUser;

/// JSON error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status code plus JSON error body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_body(error: impl Into<String>, message: Option<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: error.into(),
        message,
    })
}

/// Map a catalog error onto a status code and response body.
///
/// Store-level failures are logged in full here and surfaced as a generic
/// internal error; everything else reports its own safe message.
pub fn reject(err: CatalogError) -> ApiError {
    match err {
        CatalogError::InvalidParameter(_)
        | CatalogError::ValidationFailed(_)
        | CatalogError::MissingRequiredField(_)
        | CatalogError::ReferenceNotFound { .. } => {
            (StatusCode::BAD_REQUEST, error_body(err.to_string(), None))
        }
        CatalogError::AlreadyExists(_) => (StatusCode::CONFLICT, error_body(err.to_string(), None)),
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, error_body(err.to_string(), None)),
        CatalogError::Unauthorized(detail) => (
            StatusCode::UNAUTHORIZED,
            error_body("unauthorized", Some(detail)),
        ),
        CatalogError::QueryFailed(_) | CatalogError::TransactionFailed(_) => {
            tracing::error!("Database operation failed: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("internal server error", None),
            )
        }
        CatalogError::Internal(_) => {
            tracing::error!("Request failed: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("internal server error", None),
            )
        }
    }
}

/// Require a valid bearer token on the request.
pub fn authorize(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiError> {
    let auth_value = match headers.get(AUTHORIZATION) {
        Some(value) => value,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                error_body(
                    "unauthorized",
                    Some("Authorization header is required".to_string()),
                ),
            ));
        }
    };

    let auth_str = match auth_value.to_str() {
        Ok(s) => s,
        Err(_) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                error_body(
                    "unauthorized",
                    Some("Authorization header is required".to_string()),
                ),
            ));
        }
    };

    if !auth_str.starts_with("Bearer ") {
        return Err((
            StatusCode::UNAUTHORIZED,
            error_body(
                "unauthorized",
                Some("Bearer token not found in Authorization header".to_string()),
            ),
        ));
    }

    let token = auth_str.trim_start_matches("Bearer ").trim();
    state.auth.validate_token(token).map_err(reject)
}
