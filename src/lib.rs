//! Bookshelf
//!
//! A small REST JSON service for a library's book inventory: create, update,
//! delete, look up and search books, borrow and return them, and list the most
//! borrowed titles.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
