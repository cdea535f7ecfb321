//! Books repository for database operations.
//!
//! Every mutating call runs in its own transaction. Errors are passed through as
//! raw `sqlx::Error` so the service can tell `RowNotFound` apart from real
//! store failures.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::models::book::{Book, BookFilter, NewBook};

pub type StoreResult<T> = Result<T, sqlx::Error>;

const BOOK_COLUMNS: &str =
    "id, title, author, category, is_borrowed, borrow_count, created_at, updated_at";

/// Persistence contract for books, one method per domain action
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new book; the store assigns the id and timestamps
    async fn create(&self, book: NewBook) -> StoreResult<Book>;

    /// Persist title, author and category. Borrow state is left untouched.
    async fn update(&self, book: Book) -> StoreResult<()>;

    /// Hard delete. Deleting a missing id is not an error.
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// `sqlx::Error::RowNotFound` when the id does not exist
    async fn find_by_id(&self, id: i64) -> StoreResult<Book>;

    async fn find_all(&self, filter: BookFilter) -> StoreResult<Vec<Book>>;

    /// Mark the book borrowed and store the new counter. Returns `false` when
    /// the book was already borrowed or its counter moved since it was read.
    async fn borrow_book(&self, id: i64, borrow_count: i64) -> StoreResult<bool>;

    /// Clear the borrowed flag. Returns `false` when the book was not borrowed.
    async fn return_book(&self, id: i64) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so the filter is matched as a plain substring
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn create(&self, book: NewBook) -> StoreResult<Book> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, category, is_borrowed, borrow_count, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, 0, ?, ?)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, book: Book) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE books SET title = ?, author = ?, category = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(Utc::now())
        .bind(book.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_all(&self, filter: BookFilter) -> StoreResult<Vec<Book>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM books WHERE 1=1", BOOK_COLUMNS));

        let predicates = [
            ("title", filter.title.as_deref()),
            ("author", filter.author.as_deref()),
            ("category", filter.category.as_deref()),
        ];
        for (column, value) in predicates {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                builder.push(format!(" AND {} LIKE ", column));
                builder.push_bind(like_pattern(value));
                builder.push(" ESCAPE '\\'");
            }
        }

        if let Some(sort) = filter.sort {
            builder.push(format!(
                " ORDER BY {} {}, id ASC",
                sort.field.column(),
                sort.direction.keyword()
            ));
        }

        builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await
    }

    async fn borrow_book(&self, id: i64, borrow_count: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET is_borrowed = TRUE, borrow_count = ?, updated_at = ?
            WHERE id = ? AND is_borrowed = FALSE AND borrow_count = ?
            "#,
        )
        .bind(borrow_count)
        .bind(Utc::now())
        .bind(id)
        .bind(borrow_count - 1)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn return_book(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE books SET is_borrowed = FALSE, updated_at = ? WHERE id = ? AND is_borrowed = TRUE",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }
}
