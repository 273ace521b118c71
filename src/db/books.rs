//! Book database repository
//!
//! Listings run in two modes. Basic mode is a single-table query over
//! `books`. Joined mode pages book ids first, then attaches authors through
//! the link table and folds the flat rows back into one entry per book, so
//! LIMIT/OFFSET always count books rather than join rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::error::{CatalogError, Result, is_foreign_key_violation};
use crate::db::filters::BookFilters;

/// Book record from database
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for BookRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One flat row from the books-to-authors LEFT JOIN.
///
/// Author columns decode as `Option` because a book without a (matching)
/// author still produces a row, with NULLs on the author side.
#[derive(Debug, Clone)]
pub struct BookAuthorRow {
    pub book_id: i64,
    pub book_uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<i64>,
    pub author_uuid: Option<Uuid>,
    pub author_name: Option<String>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for BookAuthorRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(Self {
            book_id: row.try_get("id")?,
            book_uuid: row.try_get("uuid")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            author_id: row.try_get("author_id")?,
            author_uuid: row.try_get("author_uuid")?,
            author_name: row.try_get("author_name")?,
        })
    }
}

/// Author as embedded in a book listing.
#[derive(Debug, Clone)]
pub struct BookAuthor {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for BookAuthor {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
        })
    }
}

/// A book with its deduplicated, query-ordered author list.
#[derive(Debug, Clone)]
pub struct BookWithAuthors {
    pub book: BookRecord,
    pub authors: Vec<BookAuthor>,
}

/// Input for creating a book together with its author links.
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub description: Option<String>,
    pub author_ids: Vec<i64>,
}

/// Folds ordered join rows into one entry per book.
///
/// The first row seen for a book fixes its position and base fields; later
/// rows only append authors, deduplicated by author id. Books are tracked
/// through an id-to-index map, so the fold stays correct even when a book's
/// rows arrive non-contiguously. Rows with NULL author columns contribute a
/// book with an empty author list.
pub fn fold_book_rows(rows: Vec<BookAuthorRow>) -> Vec<BookWithAuthors> {
    let mut books: Vec<BookWithAuthors> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let idx = match index_by_id.get(&row.book_id).copied() {
            Some(idx) => idx,
            None => {
                let idx = books.len();
                books.push(BookWithAuthors {
                    book: BookRecord {
                        id: row.book_id,
                        uuid: row.book_uuid,
                        title: row.title.clone(),
                        description: row.description.clone(),
                        created_at: row.created_at,
                    },
                    authors: Vec::new(),
                });
                index_by_id.insert(row.book_id, idx);
                idx
            }
        };

        if let (Some(id), Some(uuid), Some(name)) =
            (row.author_id, row.author_uuid, row.author_name)
        {
            let authors = &mut books[idx].authors;
            if !authors.iter().any(|a| a.id == id) {
                authors.push(BookAuthor { id, uuid, name });
            }
        }
    }

    books
}

/// ORDER BY clause for the listing queries. The id column is the final sort
/// key: ties between equal sort values carry no defined order in SQL, and an
/// unpinned tie can repeat on or vanish from adjacent pages.
fn listing_order(filters: &BookFilters, prefix: &str) -> String {
    format!(
        "ORDER BY {}{} {}, {}id",
        prefix,
        filters.sort.to_column(),
        filters.direction.to_sql(),
        prefix
    )
}

pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List books from the single table, with total count.
    ///
    /// Honors the title filter only; author filtering needs the joined mode.
    pub async fn list_basic(&self, filters: &BookFilters) -> Result<(Vec<BookRecord>, i64)> {
        let where_clause = if filters.title.is_some() {
            "WHERE LOWER(title) LIKE $1"
        } else {
            ""
        };

        let count_query = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let data_query = format!(
            "SELECT id, uuid, title, description, created_at FROM books {} {} LIMIT {} OFFSET {}",
            where_clause,
            listing_order(filters, ""),
            filters.limit,
            filters.offset
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(title) = &filters.title {
            count_builder = count_builder.bind(format!("%{}%", title.to_lowercase()));
        }
        let total: i64 = count_builder.fetch_one(&self.pool).await?;

        let mut data_builder = sqlx::query_as::<_, BookRecord>(&data_query);
        if let Some(title) = &filters.title {
            data_builder = data_builder.bind(format!("%{}%", title.to_lowercase()));
        }
        let records = data_builder.fetch_all(&self.pool).await?;

        Ok((records, total))
    }

    /// List books with their authors, with total count.
    ///
    /// Pagination happens on a page-of-ids query over `books`, with the
    /// author filter expressed as EXISTS through the link table. The count
    /// query shares those conditions, so it counts books, never join rows,
    /// and a book with no author matching a non-empty filter is neither
    /// counted nor paged. The page is then re-fetched LEFT JOINed to its
    /// authors and folded.
    pub async fn list_with_authors(
        &self,
        filters: &BookFilters,
    ) -> Result<(Vec<BookWithAuthors>, i64)> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx = 1;

        if filters.title.is_some() {
            conditions.push(format!("LOWER(b.title) LIKE ${}", param_idx));
            param_idx += 1;
        }
        if filters.author_name.is_some() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_authors ba \
                 JOIN authors a ON a.id = ba.author_id \
                 WHERE ba.book_id = b.id AND LOWER(a.name) LIKE ${})",
                param_idx
            ));
            param_idx += 1;
        }
        let _ = param_idx;

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Shared with the fetch query below so it reproduces the page order.
        let order_clause = listing_order(filters, "b.");

        let count_query = format!("SELECT COUNT(*) FROM books b {}", where_clause);
        let id_query = format!(
            "SELECT b.id FROM books b {} {} LIMIT {} OFFSET {}",
            where_clause, order_clause, filters.limit, filters.offset
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        let mut id_builder = sqlx::query_scalar::<_, i64>(&id_query);
        if let Some(title) = &filters.title {
            let pattern = format!("%{}%", title.to_lowercase());
            count_builder = count_builder.bind(pattern.clone());
            id_builder = id_builder.bind(pattern);
        }
        if let Some(author) = &filters.author_name {
            let pattern = format!("%{}%", author.to_lowercase());
            count_builder = count_builder.bind(pattern.clone());
            id_builder = id_builder.bind(pattern);
        }

        let total: i64 = count_builder.fetch_one(&self.pool).await?;
        let page_ids: Vec<i64> = id_builder.fetch_all(&self.pool).await?;

        if page_ids.is_empty() {
            return Ok((Vec::new(), total));
        }

        // The author predicate sits on the join, not the WHERE, so a paged
        // book keeps its row (with NULL author columns) rather than
        // disappearing when none of its authors match.
        let author_join = if filters.author_name.is_some() {
            "LEFT JOIN authors a ON a.id = ba.author_id AND LOWER(a.name) LIKE $2"
        } else {
            "LEFT JOIN authors a ON a.id = ba.author_id"
        };

        let fetch_query = format!(
            r#"
            SELECT b.id, b.uuid, b.title, b.description, b.created_at,
                   a.id AS author_id, a.uuid AS author_uuid, a.name AS author_name
            FROM books b
            LEFT JOIN book_authors ba ON ba.book_id = b.id
            {}
            WHERE b.id = ANY($1)
            {}, a.name ASC
            "#,
            author_join, order_clause
        );

        let mut fetch_builder = sqlx::query_as::<_, BookAuthorRow>(&fetch_query).bind(&page_ids);
        if let Some(author) = &filters.author_name {
            fetch_builder = fetch_builder.bind(format!("%{}%", author.to_lowercase()));
        }
        let rows = fetch_builder.fetch_all(&self.pool).await?;

        Ok((fold_book_rows(rows), total))
    }

    /// Get a single book with its authors
    pub async fn get_with_authors(&self, id: i64) -> Result<Option<BookWithAuthors>> {
        let rows = sqlx::query_as::<_, BookAuthorRow>(
            r#"
            SELECT b.id, b.uuid, b.title, b.description, b.created_at,
                   a.id AS author_id, a.uuid AS author_uuid, a.name AS author_name
            FROM books b
            LEFT JOIN book_authors ba ON ba.book_id = b.id
            LEFT JOIN authors a ON a.id = ba.author_id
            WHERE b.id = $1
            ORDER BY a.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_book_rows(rows).into_iter().next())
    }

    /// Create a book together with its author links.
    ///
    /// Author ids are verified before the transaction opens, so the common
    /// failure (an unknown id) reports cleanly without touching the store.
    /// The book row and its link rows commit together or not at all; the
    /// foreign keys remain the backstop for authors deleted in between.
    pub async fn create_with_authors(&self, input: CreateBook) -> Result<BookWithAuthors> {
        if input.author_ids.is_empty() {
            return Err(CatalogError::MissingRequiredField("authorIds"));
        }

        // Duplicate ids collapse to one link row.
        let mut author_ids: Vec<i64> = Vec::new();
        for &id in &input.author_ids {
            if !author_ids.contains(&id) {
                author_ids.push(id);
            }
        }

        let authors = sqlx::query_as::<_, BookAuthor>(
            "SELECT id, uuid, name FROM authors WHERE id = ANY($1) ORDER BY name",
        )
        .bind(&author_ids)
        .fetch_all(&self.pool)
        .await?;

        for &id in &author_ids {
            if !authors.iter().any(|a| a.id == id) {
                return Err(CatalogError::ReferenceNotFound {
                    entity: "author",
                    id,
                });
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(CatalogError::TransactionFailed)?;

        let book = sqlx::query_as::<_, BookRecord>(
            r#"
            INSERT INTO books (title, description)
            VALUES ($1, $2)
            RETURNING id, uuid, title, description, created_at
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        for &author_id in &author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                .bind(book.id)
                .bind(author_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        CatalogError::ReferenceNotFound {
                            entity: "author",
                            id: author_id,
                        }
                    } else {
                        CatalogError::QueryFailed(e)
                    }
                })?;
        }

        // Dropping the transaction on any early return above rolls the
        // book row back along with its links.
        tx.commit()
            .await
            .map_err(CatalogError::TransactionFailed)?;

        Ok(BookWithAuthors { book, authors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(
        book_id: i64,
        title: &str,
        author: Option<(i64, &str)>,
    ) -> BookAuthorRow {
        BookAuthorRow {
            book_id,
            book_uuid: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            author_id: author.map(|(id, _)| id),
            author_uuid: author.map(|_| Uuid::new_v4()),
            author_name: author.map(|(_, name)| name.to_string()),
        }
    }

    #[test]
    fn test_fold_groups_rows_by_book() {
        let rows = vec![
            row(1, "1984", Some((10, "George Orwell"))),
            row(2, "Good Omens", Some((11, "Terry Pratchett"))),
            row(2, "Good Omens", Some((12, "Neil Gaiman"))),
        ];

        let books = fold_book_rows(rows);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].book.title, "1984");
        assert_eq!(books[0].authors.len(), 1);
        assert_eq!(books[1].book.title, "Good Omens");
        let names: Vec<_> = books[1].authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Terry Pratchett", "Neil Gaiman"]);
    }

    #[test]
    fn test_fold_preserves_row_order_of_first_occurrence() {
        let rows = vec![
            row(5, "Brave New World", Some((1, "Aldous Huxley"))),
            row(3, "1984", Some((2, "George Orwell"))),
            row(9, "Animal Farm", Some((2, "George Orwell"))),
        ];

        let books = fold_book_rows(rows);
        let titles: Vec<_> = books.iter().map(|b| b.book.title.as_str()).collect();
        assert_eq!(titles, vec!["Brave New World", "1984", "Animal Farm"]);
    }

    #[test]
    fn test_fold_handles_non_contiguous_rows_for_one_book() {
        let rows = vec![
            row(1, "Good Omens", Some((11, "Terry Pratchett"))),
            row(2, "1984", Some((10, "George Orwell"))),
            row(1, "Good Omens", Some((12, "Neil Gaiman"))),
        ];

        let books = fold_book_rows(rows);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].book.id, 1);
        assert_eq!(books[0].authors.len(), 2);
        assert_eq!(books[1].book.id, 2);
    }

    #[test]
    fn test_fold_deduplicates_repeated_authors() {
        let rows = vec![
            row(1, "1984", Some((10, "George Orwell"))),
            row(1, "1984", Some((10, "George Orwell"))),
        ];

        let books = fold_book_rows(rows);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].authors.len(), 1);
    }

    #[test]
    fn test_fold_keeps_authorless_books_with_empty_list() {
        let rows = vec![
            row(1, "Anonymous Pamphlet", None),
            row(2, "1984", Some((10, "George Orwell"))),
        ];

        let books = fold_book_rows(rows);
        assert_eq!(books.len(), 2);
        assert!(books[0].authors.is_empty());
        assert_eq!(books[1].authors.len(), 1);
    }

    #[test]
    fn test_fold_of_no_rows_is_empty() {
        assert!(fold_book_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_listing_order_pins_ties_with_the_id_column() {
        let filters = BookFilters::from_query(None, None, None, None, None, None).unwrap();
        assert_eq!(listing_order(&filters, ""), "ORDER BY title ASC, id");
        assert_eq!(listing_order(&filters, "b."), "ORDER BY b.title ASC, b.id");
    }

    #[test]
    fn test_listing_order_applies_the_requested_sort_before_the_tiebreak() {
        let filters =
            BookFilters::from_query(None, None, Some("created_at"), Some("desc"), None, None)
                .unwrap();
        assert_eq!(listing_order(&filters, ""), "ORDER BY created_at DESC, id");
    }
}
