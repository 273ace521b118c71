//! Author database repository

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::books::BookRecord;
use crate::db::error::Result;

/// Author record from database
#[derive(Debug, Clone)]
pub struct AuthorRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for AuthorRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            bio: row.try_get("bio")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One row from the authors-to-books link query.
#[derive(Debug, Clone)]
pub struct AuthorBookRow {
    pub author_id: i64,
    pub book_id: i64,
    pub book_uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for AuthorBookRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(Self {
            author_id: row.try_get("author_id")?,
            book_id: row.try_get("id")?,
            book_uuid: row.try_get("uuid")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// An author with their books, title-ordered.
#[derive(Debug, Clone)]
pub struct AuthorWithBooks {
    pub author: AuthorRecord,
    pub books: Vec<BookRecord>,
}

/// Input for creating an author.
#[derive(Debug, Clone)]
pub struct CreateAuthor {
    pub name: String,
    pub bio: Option<String>,
}

pub struct AuthorRepository {
    pool: PgPool,
}

impl AuthorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new author
    pub async fn create(&self, input: CreateAuthor) -> Result<AuthorRecord> {
        let record = sqlx::query_as::<_, AuthorRecord>(
            r#"
            INSERT INTO authors (name, bio)
            VALUES ($1, $2)
            RETURNING id, uuid, name, bio, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.bio)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// List all authors ordered by name
    pub async fn list(&self) -> Result<Vec<AuthorRecord>> {
        let records = sqlx::query_as::<_, AuthorRecord>(
            "SELECT id, uuid, name, bio, created_at, updated_at FROM authors ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// List all authors with their books embedded.
    ///
    /// Two queries: the authors themselves, then every linked book in one
    /// pass, folded onto its authors through an id-keyed index map. Authors
    /// with no books keep an empty list.
    pub async fn list_with_books(&self) -> Result<Vec<AuthorWithBooks>> {
        let authors = self.list().await?;
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = authors.iter().map(|a| a.id).collect();
        let mut result: Vec<AuthorWithBooks> = authors
            .into_iter()
            .map(|author| AuthorWithBooks {
                author,
                books: Vec::new(),
            })
            .collect();
        let index_by_id: HashMap<i64, usize> = result
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.author.id, idx))
            .collect();

        let rows = sqlx::query_as::<_, AuthorBookRow>(
            r#"
            SELECT ba.author_id, b.id, b.uuid, b.title, b.description, b.created_at
            FROM books b
            JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = ANY($1)
            ORDER BY ba.author_id, b.title
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            if let Some(&idx) = index_by_id.get(&row.author_id) {
                result[idx].books.push(BookRecord {
                    id: row.book_id,
                    uuid: row.book_uuid,
                    title: row.title,
                    description: row.description,
                    created_at: row.created_at,
                });
            }
        }

        Ok(result)
    }

    /// Get one author with their books
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AuthorWithBooks>> {
        let author = sqlx::query_as::<_, AuthorRecord>(
            "SELECT id, uuid, name, bio, created_at, updated_at FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let author = match author {
            Some(author) => author,
            None => return Ok(None),
        };

        let books = sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT b.id, b.uuid, b.title, b.description, b.created_at
            FROM books b
            JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = $1
            ORDER BY b.title
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(AuthorWithBooks { author, books }))
    }
}
