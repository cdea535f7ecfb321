//! Data models for Bookshelf

pub mod book;

// Re-export commonly used types
pub use book::{
    Book, BookData, BookFilter, BookListResponse, BookQuery, BookRequest, BookResponse, BookSort,
    NewBook, SortDirection, SortField,
};
