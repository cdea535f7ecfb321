//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Date format used by every outgoing view (`DD/MM/YYYY`)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Book row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub is_borrowed: bool,
    /// Historical number of successful borrows, never decremented
    pub borrow_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller on creation; the store assigns the rest
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
}

/// Create / update request body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
}

impl From<BookRequest> for NewBook {
    fn from(request: BookRequest) -> Self {
        Self {
            title: request.title,
            author: request.author,
            category: request.category,
        }
    }
}

/// Search query parameters; absent or empty means "no filter"
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Substring of the title
    pub title: Option<String>,
    /// Substring of the author
    pub author: Option<String>,
    /// Substring of the category
    pub category: Option<String>,
}

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Author,
    Category,
    BorrowCount,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Category => "category",
            SortField::BorrowCount => "borrow_count",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Persistence-level listing criteria
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub sort: Option<BookSort>,
}

impl BookQuery {
    /// Build from raw query pairs; a repeated key keeps its first value
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "title" => &mut query.title,
                "author" => &mut query.author,
                "category" => &mut query.category,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

impl From<BookQuery> for BookFilter {
    fn from(query: BookQuery) -> Self {
        Self {
            title: query.title,
            author: query.author,
            category: query.category,
            sort: None,
        }
    }
}

impl BookFilter {
    pub fn sorted(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some(BookSort { field, direction });
        self
    }
}

/// Outgoing view of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookData {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub is_borrowed: bool,
    pub borrow_count: i64,
    /// Creation date (DD/MM/YYYY)
    #[serde(rename = "create_at")]
    pub created_at: String,
    /// Last modification date (DD/MM/YYYY)
    #[serde(rename = "update_at")]
    pub updated_at: String,
}

impl From<&Book> for BookData {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            is_borrowed: book.is_borrowed,
            borrow_count: book.borrow_count,
            created_at: book.created_at.format(DATE_FORMAT).to_string(),
            updated_at: book.updated_at.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Single-item envelope; `data` is omitted when there is nothing to return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BookData>,
}

impl BookResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, book: &Book) -> Self {
        Self {
            message: message.into(),
            data: Some(BookData::from(book)),
        }
    }
}

/// List envelope; `data` is always present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookListResponse {
    pub message: String,
    pub data: Vec<BookData>,
}

impl BookListResponse {
    pub fn new(message: impl Into<String>, books: &[Book]) -> Self {
        Self {
            message: message.into(),
            data: books.iter().map(BookData::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Book {
        Book {
            id: 7,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            category: "SF".into(),
            is_borrowed: true,
            borrow_count: 3,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_book_data_formats_dates() {
        let data = BookData::from(&sample());
        assert_eq!(data.created_at, "05/03/2024");
        assert_eq!(data.updated_at, "31/12/2024");
        assert_eq!(data.borrow_count, 3);
        assert!(data.is_borrowed);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["create_at"], "05/03/2024");
        assert_eq!(json["update_at"], "31/12/2024");
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_message_only_response_omits_data() {
        let json = serde_json::to_value(BookResponse::message("ok")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "ok" }));
    }

    #[test]
    fn test_empty_list_keeps_data_array() {
        let json = serde_json::to_value(BookListResponse::new("success", &[])).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "success", "data": [] }));
    }

    #[test]
    fn test_request_missing_fields_fail_validation() {
        let request: BookRequest = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 2);
        assert!(fields.keys().any(|f| f.to_string() == "author"));
        assert!(fields.keys().any(|f| f.to_string() == "category"));
    }

    #[test]
    fn test_request_complete_passes_validation() {
        let request: BookRequest =
            serde_json::from_str(r#"{"title": "T", "author": "A", "category": "C"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_query_pairs_keep_first_value() {
        let query = BookQuery::from_pairs([
            ("title".to_string(), "a".to_string()),
            ("page".to_string(), "2".to_string()),
            ("title".to_string(), "b".to_string()),
            ("author".to_string(), "".to_string()),
        ]);
        assert_eq!(query.title.as_deref(), Some("a"));
        assert_eq!(query.author.as_deref(), Some(""));
        assert!(query.category.is_none());
    }

    #[test]
    fn test_query_to_filter_has_no_sort() {
        let filter = BookFilter::from(BookQuery {
            title: Some("du".into()),
            ..Default::default()
        });
        assert_eq!(filter.title.as_deref(), Some("du"));
        assert!(filter.sort.is_none());
    }
}
