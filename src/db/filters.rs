//! Filter normalization for book listings

use crate::db::error::CatalogError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_PAGE: i64 = 1;
pub const MAX_PAGE: i64 = 1000;

/// Sort fields accepted by the book listing.
///
/// The closed set keeps user text out of ORDER BY clauses: a token not listed
/// here is rejected before any query string exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortField {
    Title,
    CreatedAt,
}

impl BookSortField {
    /// Parses a query-string token. Unknown tokens are an error, never a
    /// fallback to a default.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        match raw {
            "title" => Ok(BookSortField::Title),
            "created_at" => Ok(BookSortField::CreatedAt),
            other => Err(CatalogError::InvalidParameter(format!(
                "invalid sort field: {other}"
            ))),
        }
    }

    pub fn to_column(&self) -> &'static str {
        match self {
            BookSortField::Title => "title",
            BookSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        if raw.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(CatalogError::InvalidParameter(format!(
                "invalid sort direction: {raw}"
            )))
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Normalized listing parameters, ready for query assembly.
#[derive(Debug, Clone)]
pub struct BookFilters {
    /// Case-insensitive title substring; `None` means no restriction.
    pub title: Option<String>,
    /// Case-insensitive author-name substring, honored in joined listings.
    pub author_name: Option<String>,
    pub sort: BookSortField,
    pub direction: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

impl BookFilters {
    /// Builds normalized filters from raw query parameters.
    ///
    /// Limit is clamped to [1, 100] (default 10), page to [1, 1000]
    /// (default 1), and the offset derived as `(page - 1) * limit`. Absent or
    /// blank sort tokens fall back to title ascending; present-but-unknown
    /// tokens fail with `InvalidParameter`.
    pub fn from_query(
        title: Option<&str>,
        author: Option<&str>,
        sort: Option<&str>,
        sort_dir: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Self, CatalogError> {
        let sort = match non_blank(sort) {
            Some(raw) => BookSortField::parse(raw)?,
            None => BookSortField::Title,
        };
        let direction = match non_blank(sort_dir) {
            Some(raw) => SortDirection::parse(raw)?,
            None => SortDirection::Asc,
        };

        let limit = clamp(limit.unwrap_or(DEFAULT_LIMIT), 1, MAX_LIMIT);
        let page = clamp(page.unwrap_or(DEFAULT_PAGE), 1, MAX_PAGE);

        Ok(Self {
            title: non_blank(title).map(str::to_string),
            author_name: non_blank(author).map(str::to_string),
            sort,
            direction,
            limit,
            offset: (page - 1) * limit,
        })
    }

    /// 1-based page recomputed from the normalized offset.
    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.min(max).max(min)
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_parameters_given() {
        let f = BookFilters::from_query(None, None, None, None, None, None).unwrap();
        assert_eq!(f.limit, 10);
        assert_eq!(f.offset, 0);
        assert_eq!(f.page(), 1);
        assert_eq!(f.sort, BookSortField::Title);
        assert_eq!(f.direction, SortDirection::Asc);
        assert!(f.title.is_none());
        assert!(f.author_name.is_none());
    }

    #[test]
    fn test_limit_and_page_are_clamped() {
        let f = BookFilters::from_query(None, None, None, None, Some(5000), Some(999)).unwrap();
        assert_eq!(f.limit, 100);
        assert_eq!(f.offset, 999 * 100);

        let f = BookFilters::from_query(None, None, None, None, Some(0), Some(0)).unwrap();
        assert_eq!(f.limit, 1);
        assert_eq!(f.offset, 0);

        let f = BookFilters::from_query(None, None, None, None, Some(-3), Some(-10)).unwrap();
        assert_eq!(f.limit, 1);
        assert_eq!(f.offset, 0);
    }

    #[test]
    fn test_offset_derives_from_page_and_limit() {
        let f = BookFilters::from_query(None, None, None, None, Some(3), Some(25)).unwrap();
        assert_eq!(f.offset, 50);
        assert_eq!(f.page(), 3);
    }

    #[test]
    fn test_unknown_sort_field_is_rejected() {
        let err = BookFilters::from_query(None, None, Some("isbn"), None, None, None).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidParameter(_)));
    }

    #[test]
    fn test_unknown_sort_direction_is_rejected() {
        let err = BookFilters::from_query(None, None, Some("title"), Some("sideways"), None, None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidParameter(_)));
    }

    #[test]
    fn test_direction_parse_ignores_case() {
        assert_eq!(SortDirection::parse("desc").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::parse("DESC").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::parse("Asc").unwrap(), SortDirection::Asc);
    }

    #[test]
    fn test_blank_text_filters_mean_no_restriction() {
        let f = BookFilters::from_query(Some(""), Some("   "), None, None, None, None).unwrap();
        assert!(f.title.is_none());
        assert!(f.author_name.is_none());
    }

    #[test]
    fn test_sort_tokens_map_to_fixed_sql() {
        assert_eq!(BookSortField::Title.to_column(), "title");
        assert_eq!(BookSortField::CreatedAt.to_column(), "created_at");
        assert_eq!(SortDirection::Asc.to_sql(), "ASC");
        assert_eq!(SortDirection::Desc.to_sql(), "DESC");
    }
}
