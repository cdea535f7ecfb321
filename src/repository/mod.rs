//! Repository layer for database operations

pub mod books;

use sqlx::{Pool, Sqlite};

pub use books::{BookStore, BooksRepository, StoreResult};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub books: BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            books: BooksRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the store, used by the readiness probe
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
