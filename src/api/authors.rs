//! Author catalog endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::db::{AuthorRecord, AuthorWithBooks, CatalogError, CreateAuthor};

use super::books::BookResponse;
use super::{ApiError, authorize, reject};

#[derive(Debug, Deserialize)]
pub struct AuthorListQuery {
    /// Embeds each author's books in the response.
    #[serde(rename = "withBooks", default)]
    pub with_books: bool,
}

/// Author as returned by the API. `books` is present when requested and
/// omitted otherwise.
#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub uuid: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<BookResponse>>,
}

impl From<AuthorRecord> for AuthorResponse {
    fn from(author: AuthorRecord) -> Self {
        Self {
            uuid: author.uuid,
            name: author.name,
            bio: author.bio,
            created_at: author.created_at,
            updated_at: author.updated_at,
            books: None,
        }
    }
}

impl From<AuthorWithBooks> for AuthorResponse {
    fn from(entry: AuthorWithBooks) -> Self {
        let books = entry.books.into_iter().map(BookResponse::from).collect();
        let mut response = AuthorResponse::from(entry.author);
        response.books = Some(books);
        response
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorRequest {
    pub name: String,
    pub bio: Option<String>,
}

/// List authors, optionally with their books
async fn list_authors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuthorListQuery>,
) -> Result<Json<Vec<AuthorResponse>>, ApiError> {
    authorize(&state, &headers)?;

    let authors: Vec<AuthorResponse> = if query.with_books {
        let entries = state.db.authors().list_with_books().await.map_err(reject)?;
        entries.into_iter().map(AuthorResponse::from).collect()
    } else {
        let records = state.db.authors().list().await.map_err(reject)?;
        records.into_iter().map(AuthorResponse::from).collect()
    };

    Ok(Json(authors))
}

/// Create a new author
async fn create_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>), ApiError> {
    authorize(&state, &headers)?;

    if req.name.trim().is_empty() {
        return Err(reject(CatalogError::MissingRequiredField("name")));
    }

    let created = state
        .db
        .authors()
        .create(CreateAuthor {
            name: req.name,
            bio: req.bio,
        })
        .await
        .map_err(reject)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Fetch a single author with their books
async fn get_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<AuthorResponse>, ApiError> {
    authorize(&state, &headers)?;

    match state.db.authors().get_by_id(id).await.map_err(reject)? {
        Some(author) => Ok(Json(author.into())),
        None => Err(reject(CatalogError::NotFound("author"))),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/{id}", get(get_author))
}
