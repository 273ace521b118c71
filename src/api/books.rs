//! Book catalog endpoints

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
use crate::db::{BookAuthor, BookFilters, BookRecord, BookWithAuthors, CatalogError, CreateBook};

use super::{ApiError, authorize, error_body, reject};

#[derive(Debug, Deserialize)]
pub struct BookListQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Switches the listing to joined mode with full author entries.
    #[serde(default)]
    pub with_authors: bool,
    pub sort: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub uuid: Uuid,
    pub name: String,
}

impl From<BookAuthor> for AuthorSummary {
    fn from(author: BookAuthor) -> Self {
        Self {
            uuid: author.uuid,
            name: author.name,
        }
    }
}

/// Book as returned by the API. `authors` is present in joined mode (empty
/// for a book with no authors) and omitted entirely in basic mode.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub uuid: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<AuthorSummary>>,
}

impl From<BookRecord> for BookResponse {
    fn from(book: BookRecord) -> Self {
        Self {
            uuid: book.uuid,
            title: book.title,
            description: book.description,
            created_at: book.created_at,
            authors: None,
        }
    }
}

impl From<BookWithAuthors> for BookResponse {
    fn from(entry: BookWithAuthors) -> Self {
        let authors = entry
            .authors
            .into_iter()
            .map(AuthorSummary::from)
            .collect();
        let mut response = BookResponse::from(entry.book);
        response.authors = Some(authors);
        response
    }
}

#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub data: Vec<BookResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "authorIds", default)]
    pub author_ids: Vec<i64>,
}

fn validate_book_input(title: &str, description: Option<&str>) -> Result<(), CatalogError> {
    let title_len = title.chars().count();
    if !(2..=100).contains(&title_len) {
        return Err(CatalogError::ValidationFailed(
            "title must be between 2 and 100 characters".to_string(),
        ));
    }
    if let Some(description) = description {
        if description.chars().count() > 500 {
            return Err(CatalogError::ValidationFailed(
                "description must be at most 500 characters".to_string(),
            ));
        }
    }
    Ok(())
}

/// List books with filtering, sorting, and pagination
async fn list_books(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BookListQuery>,
) -> Result<Json<BookListResponse>, ApiError> {
    authorize(&state, &headers)?;

    let filters = BookFilters::from_query(
        query.title.as_deref(),
        query.author.as_deref(),
        query.sort.as_deref(),
        query.sort_dir.as_deref(),
        query.page,
        query.limit,
    )
    .map_err(reject)?;

    let (data, total): (Vec<BookResponse>, i64) = if query.with_authors {
        let (books, total) = state
            .db
            .books()
            .list_with_authors(&filters)
            .await
            .map_err(reject)?;
        (books.into_iter().map(BookResponse::from).collect(), total)
    } else {
        let (books, total) = state
            .db
            .books()
            .list_basic(&filters)
            .await
            .map_err(reject)?;
        (books.into_iter().map(BookResponse::from).collect(), total)
    };

    Ok(Json(BookListResponse {
        data,
        total,
        page: filters.page(),
        limit: filters.limit,
    }))
}

/// Create a book linked to existing authors
async fn create_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    authorize(&state, &headers)?;
    validate_book_input(&req.title, req.description.as_deref()).map_err(reject)?;

    let created = state
        .db
        .books()
        .create_with_authors(CreateBook {
            title: req.title,
            description: req.description,
            author_ids: req.author_ids,
        })
        .await
        .map_err(reject)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Fetch a single book with its authors
async fn get_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookResponse>, ApiError> {
    authorize(&state, &headers)?;

    match state.db.books().get_with_authors(id).await.map_err(reject)? {
        Some(book) => Ok(Json(book.into())),
        None => Err(reject(CatalogError::NotFound("book"))),
    }
}

/// Update a book (not yet implemented)
async fn update_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Result<Json<BookResponse>, ApiError> {
    authorize(&state, &headers)?;

    Err((
        StatusCode::NOT_IMPLEMENTED,
        error_body("book updates are not supported yet", None),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", get(get_book).put(update_book))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_length_bounds() {
        assert!(validate_book_input("a", None).is_err());
        assert!(validate_book_input("ab", None).is_ok());
        assert!(validate_book_input(&"x".repeat(100), None).is_ok());
        assert!(validate_book_input(&"x".repeat(101), None).is_err());
    }

    #[test]
    fn test_description_length_bound() {
        let long = "d".repeat(501);
        assert!(validate_book_input("1984", Some(&long)).is_err());
        assert!(validate_book_input("1984", Some(&"d".repeat(500))).is_ok());
        assert!(validate_book_input("1984", None).is_ok());
    }

    #[test]
    fn test_length_checks_count_characters_not_bytes() {
        // Two chars, four bytes.
        assert!(validate_book_input("\u{e9}\u{e9}", None).is_ok());
    }
}
