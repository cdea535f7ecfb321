//! Business logic services

pub mod books;

use std::sync::Arc;

use crate::repository::Repository;

pub use books::{BookService, CatalogService};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: Arc<dyn BookService>,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            books: Arc::new(CatalogService::new(Arc::new(repository.books.clone()))),
            repository,
        }
    }
}
