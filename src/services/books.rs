//! Book lifecycle service: borrow/return rules and response shaping

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::book::{
        Book, BookFilter, BookListResponse, BookQuery, BookRequest, BookResponse, NewBook,
        SortDirection, SortField,
    },
    repository::BookStore,
};

/// Messages returned to clients
pub mod messages {
    pub const FIND_NOT_FOUND: &str = "find data book by id not found";
    pub const BOOK_BORROWED: &str = "book borrowed";
    pub const BOOK_RETURNED: &str = "book returned";
    pub const GENERIC_ERROR: &str = "generic error";
    pub const CREATE_SUCCESS: &str = "create book successfully";
    pub const UPDATE_SUCCESS: &str = "update book successfully";
    pub const DELETE_SUCCESS: &str = "delete book successfully";
    pub const GET_SUCCESS: &str = "success";
    pub const BORROW_SUCCESS: &str = "borrow book successfully";
    pub const RETURN_SUCCESS: &str = "Return book successfully";
}

use messages::*;

/// Operations exposed to the HTTP layer
#[async_trait]
pub trait BookService: Send + Sync {
    async fn create_book(&self, request: BookRequest) -> AppResult<BookResponse>;
    async fn update_book(&self, id: i64, request: BookRequest) -> AppResult<BookResponse>;
    async fn delete_book(&self, id: i64) -> AppResult<BookResponse>;
    async fn get_book_by_id(&self, id: i64) -> AppResult<BookResponse>;
    async fn search_books(&self, query: BookQuery) -> AppResult<BookListResponse>;
    async fn get_most_borrowed_books(&self) -> AppResult<BookListResponse>;
    async fn borrow_book(&self, id: i64) -> AppResult<BookResponse>;
    async fn return_book(&self, id: i64) -> AppResult<BookResponse>;
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Look up a book. Not-found and store failures share the internal kind and
    /// differ only by message.
    async fn find(&self, operation: &'static str, id: i64) -> AppResult<Book> {
        self.store.find_by_id(id).await.map_err(|e| {
            tracing::error!(operation, book_id = id, error = %e, "Error finding book");
            match e {
                sqlx::Error::RowNotFound => AppError::internal(FIND_NOT_FOUND),
                _ => AppError::internal(GENERIC_ERROR),
            }
        })
    }

    async fn list(&self, operation: &'static str, filter: BookFilter) -> AppResult<BookListResponse> {
        let books = self.store.find_all(filter).await.map_err(|e| {
            tracing::error!(operation, error = %e, "Error listing books");
            AppError::internal(GENERIC_ERROR)
        })?;
        Ok(BookListResponse::new(GET_SUCCESS, &books))
    }
}

fn store_failure(operation: &'static str, id: i64, e: sqlx::Error) -> AppError {
    tracing::error!(operation, book_id = id, error = %e, "Book store failure");
    AppError::internal(GENERIC_ERROR)
}

#[async_trait]
impl BookService for CatalogService {
    async fn create_book(&self, request: BookRequest) -> AppResult<BookResponse> {
        let book = NewBook::from(request);
        match self.store.create(book.clone()).await {
            Ok(created) => {
                tracing::info!(book_id = created.id, "Book created");
                Ok(BookResponse::message(CREATE_SUCCESS))
            }
            Err(e) => {
                tracing::error!(operation = "create_book", request = ?book, error = %e, "Error creating book");
                Err(AppError::internal(GENERIC_ERROR))
            }
        }
    }

    async fn update_book(&self, id: i64, request: BookRequest) -> AppResult<BookResponse> {
        let existing = self.find("update_book", id).await?;
        let book = Book {
            title: request.title,
            author: request.author,
            category: request.category,
            ..existing
        };
        self.store
            .update(book)
            .await
            .map_err(|e| store_failure("update_book", id, e))?;
        Ok(BookResponse::message(UPDATE_SUCCESS))
    }

    async fn delete_book(&self, id: i64) -> AppResult<BookResponse> {
        let book = self.find("delete_book", id).await?;
        self.store
            .delete(book.id)
            .await
            .map_err(|e| store_failure("delete_book", id, e))?;
        Ok(BookResponse::message(DELETE_SUCCESS))
    }

    async fn get_book_by_id(&self, id: i64) -> AppResult<BookResponse> {
        let book = self.find("get_book_by_id", id).await?;
        Ok(BookResponse::with_data(GET_SUCCESS, &book))
    }

    async fn search_books(&self, query: BookQuery) -> AppResult<BookListResponse> {
        self.list("search_books", BookFilter::from(query)).await
    }

    async fn get_most_borrowed_books(&self) -> AppResult<BookListResponse> {
        let filter = BookFilter::default().sorted(SortField::BorrowCount, SortDirection::Desc);
        self.list("get_most_borrowed_books", filter).await
    }

    async fn borrow_book(&self, id: i64) -> AppResult<BookResponse> {
        let book = self.find("borrow_book", id).await?;
        if book.is_borrowed {
            tracing::warn!(operation = "borrow_book", book_id = id, "Book already borrowed");
            return Err(AppError::BadRequest(BOOK_BORROWED.to_string()));
        }

        let applied = self
            .store
            .borrow_book(id, book.borrow_count + 1)
            .await
            .map_err(|e| store_failure("borrow_book", id, e))?;
        if !applied {
            // lost a race with a concurrent borrow
            tracing::warn!(operation = "borrow_book", book_id = id, "Book borrowed concurrently");
            return Err(AppError::BadRequest(BOOK_BORROWED.to_string()));
        }
        Ok(BookResponse::message(BORROW_SUCCESS))
    }

    async fn return_book(&self, id: i64) -> AppResult<BookResponse> {
        let book = self.find("return_book", id).await?;
        if !book.is_borrowed {
            tracing::warn!(operation = "return_book", book_id = id, "Book not borrowed");
            return Err(AppError::BadRequest(BOOK_RETURNED.to_string()));
        }

        let applied = self
            .store
            .return_book(id)
            .await
            .map_err(|e| store_failure("return_book", id, e))?;
        if !applied {
            tracing::warn!(operation = "return_book", book_id = id, "Book returned concurrently");
            return Err(AppError::BadRequest(BOOK_RETURNED.to_string()));
        }
        Ok(BookResponse::message(RETURN_SUCCESS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::books::MockBookStore;
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn book(id: i64, is_borrowed: bool, borrow_count: i64) -> Book {
        Book {
            id,
            title: "title test".into(),
            author: "author test".into(),
            category: "category test".into(),
            is_borrowed,
            borrow_count,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 3, 10, 0, 0).unwrap(),
        }
    }

    fn request() -> BookRequest {
        BookRequest {
            title: "new title".into(),
            author: "new author".into(),
            category: "new category".into(),
        }
    }

    fn service(store: MockBookStore) -> CatalogService {
        CatalogService::new(Arc::new(store))
    }

    fn store_error() -> sqlx::Error {
        sqlx::Error::Protocol("connection reset".into())
    }

    fn assert_internal(err: AppError, message: &str) {
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_string(), message);
    }

    fn assert_bad_request(err: AppError, message: &str) {
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), message);
    }

    #[tokio::test]
    async fn test_borrow_success_increments_counter() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .with(eq(1))
            .times(1)
            .returning(|id| Ok(book(id, false, 4)));
        store
            .expect_borrow_book()
            .with(eq(1), eq(5))
            .times(1)
            .returning(|_, _| Ok(true));

        let resp = service(store).borrow_book(1).await.unwrap();
        assert_eq!(resp, BookResponse::message(BORROW_SUCCESS));
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn test_borrow_already_borrowed_does_not_write() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, true, 1)));
        store.expect_borrow_book().never();

        let err = service(store).borrow_book(1).await.unwrap_err();
        assert_bad_request(err, BOOK_BORROWED);
    }

    #[tokio::test]
    async fn test_borrow_lost_race_is_conflict() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 0)));
        store.expect_borrow_book().times(1).returning(|_, _| Ok(false));

        let err = service(store).borrow_book(1).await.unwrap_err();
        assert_bad_request(err, BOOK_BORROWED);
    }

    #[tokio::test]
    async fn test_borrow_not_found() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(sqlx::Error::RowNotFound));
        store.expect_borrow_book().never();

        let err = service(store).borrow_book(1).await.unwrap_err();
        assert_internal(err, FIND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_borrow_lookup_failure_is_generic() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|_| Err(store_error()));
        store.expect_borrow_book().never();

        let err = service(store).borrow_book(1).await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_borrow_write_failure_is_generic() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 0)));
        store.expect_borrow_book().returning(|_, _| Err(store_error()));

        let err = service(store).borrow_book(1).await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_return_success() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, true, 2)));
        store
            .expect_return_book()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok(true));

        let resp = service(store).return_book(3).await.unwrap();
        assert_eq!(resp, BookResponse::message(RETURN_SUCCESS));
    }

    #[tokio::test]
    async fn test_return_not_borrowed_does_not_write() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 2)));
        store.expect_return_book().never();

        let err = service(store).return_book(3).await.unwrap_err();
        assert_bad_request(err, BOOK_RETURNED);
    }

    #[tokio::test]
    async fn test_return_not_found() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(sqlx::Error::RowNotFound));
        store.expect_return_book().never();

        let err = service(store).return_book(3).await.unwrap_err();
        assert_internal(err, FIND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_book() {
        let mut store = MockBookStore::new();
        store
            .expect_create()
            .withf(|b| b.title == "new title" && b.author == "new author" && b.category == "new category")
            .times(1)
            .returning(|b| {
                Ok(Book {
                    title: b.title,
                    author: b.author,
                    category: b.category,
                    ..book(1, false, 0)
                })
            });

        let resp = service(store).create_book(request()).await.unwrap();
        assert_eq!(resp, BookResponse::message(CREATE_SUCCESS));
    }

    #[tokio::test]
    async fn test_create_book_failure() {
        let mut store = MockBookStore::new();
        store.expect_create().returning(|_| Err(store_error()));

        let err = service(store).create_book(request()).await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_update_preserves_borrow_state() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, true, 9)));
        store
            .expect_update()
            .withf(|b| {
                b.id == 5
                    && b.title == "new title"
                    && b.author == "new author"
                    && b.category == "new category"
                    && b.is_borrowed
                    && b.borrow_count == 9
            })
            .times(1)
            .returning(|_| Ok(()));

        let resp = service(store).update_book(5, request()).await.unwrap();
        assert_eq!(resp, BookResponse::message(UPDATE_SUCCESS));
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(sqlx::Error::RowNotFound));
        store.expect_update().never();

        let err = service(store).update_book(5, request()).await.unwrap_err();
        assert_internal(err, FIND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_write_failure() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 0)));
        store.expect_update().returning(|_| Err(store_error()));

        let err = service(store).update_book(5, request()).await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_delete_book() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 0)));
        store
            .expect_delete()
            .with(eq(8))
            .times(1)
            .returning(|_| Ok(()));

        let resp = service(store).delete_book(8).await.unwrap();
        assert_eq!(resp, BookResponse::message(DELETE_SUCCESS));
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(sqlx::Error::RowNotFound));
        store.expect_delete().never();

        let err = service(store).delete_book(8).await.unwrap_err();
        assert_internal(err, FIND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_failure_is_surfaced() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, false, 0)));
        store.expect_delete().returning(|_| Err(store_error()));

        let err = service(store).delete_book(8).await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_get_book_by_id_formats_view() {
        let mut store = MockBookStore::new();
        store.expect_find_by_id().returning(|id| Ok(book(id, true, 2)));

        let resp = service(store).get_book_by_id(2).await.unwrap();
        assert_eq!(resp.message, GET_SUCCESS);
        let data = resp.data.unwrap();
        assert_eq!(data.id, 2);
        assert_eq!(data.created_at, "02/01/2024");
        assert_eq!(data.updated_at, "03/02/2024");
        assert!(data.is_borrowed);
        assert_eq!(data.borrow_count, 2);
    }

    #[tokio::test]
    async fn test_get_book_by_id_not_found() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(sqlx::Error::RowNotFound));

        let err = service(store).get_book_by_id(2).await.unwrap_err();
        assert_internal(err, FIND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_passes_filters_without_sort() {
        let mut store = MockBookStore::new();
        store
            .expect_find_all()
            .with(eq(BookFilter {
                title: Some("du".into()),
                author: None,
                category: Some("sf".into()),
                sort: None,
            }))
            .times(1)
            .returning(|_| Ok(vec![book(1, false, 0), book(2, true, 1)]));

        let query = BookQuery {
            title: Some("du".into()),
            author: None,
            category: Some("sf".into()),
        };
        let resp = service(store).search_books(query).await.unwrap();
        assert_eq!(resp.message, GET_SUCCESS);
        assert_eq!(resp.data.len(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_result_is_success() {
        let mut store = MockBookStore::new();
        store.expect_find_all().returning(|_| Ok(vec![]));

        let resp = service(store).search_books(BookQuery::default()).await.unwrap();
        assert!(resp.data.is_empty());
    }

    #[tokio::test]
    async fn test_most_borrowed_sorts_by_count_desc() {
        let mut store = MockBookStore::new();
        store
            .expect_find_all()
            .with(eq(
                BookFilter::default().sorted(SortField::BorrowCount, SortDirection::Desc)
            ))
            .times(1)
            .returning(|_| Ok(vec![book(2, false, 7), book(1, false, 3)]));

        let resp = service(store).get_most_borrowed_books().await.unwrap();
        let counts: Vec<i64> = resp.data.iter().map(|d| d.borrow_count).collect();
        assert_eq!(counts, vec![7, 3]);
    }

    #[tokio::test]
    async fn test_list_failure_is_generic() {
        let mut store = MockBookStore::new();
        store.expect_find_all().returning(|_| Err(store_error()));

        let err = service(store).get_most_borrowed_books().await.unwrap_err();
        assert_internal(err, GENERIC_ERROR);
    }
}
