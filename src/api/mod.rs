//! API handlers for Bookshelf REST endpoints

pub mod books;
pub mod health;
pub mod openapi;

use std::any::Any;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::BookQuery,
    AppState,
};

/// Strictly positive integer, no sign, no leading zero
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9][0-9]*$").expect("id pattern is a valid regex")
});

pub const INVALID_ID_MESSAGE: &str = "id must contain digits only and start with 1-9";

/// Book identifier taken from the `:id` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookId(pub i64);

impl BookId {
    pub fn parse(raw: &str) -> AppResult<Self> {
        if !ID_PATTERN.is_match(raw) {
            return Err(AppError::BadRequest(INVALID_ID_MESSAGE.to_string()));
        }
        raw.parse::<i64>()
            .map(BookId)
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        BookId::parse(&raw)
    }
}

/// Search filters from the query string
pub struct BookSearch(pub BookQuery);

#[async_trait]
impl<S> FromRequestParts<S> for BookSearch
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(BookSearch(BookQuery::from_pairs(pairs)))
    }
}

/// JSON body that has been deserialized and validated
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Indented JSON response body
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            Err(e) => AppError::internal(e.to_string()).into_response(),
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "Handler panicked");
    AppError::internal("Internal Server Error").into_response()
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    let book_routes = Router::new()
        .route("/create", post(books::create_book))
        .route("/list", get(books::search_books))
        .route("/summary", get(books::get_most_borrowed_books))
        .route(
            "/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/borrow/:id", patch(books::borrow_book))
        .route("/return/:id", patch(books::return_book));

    let api = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/book", book_routes)
        .with_state(state);

    Router::new()
        .merge(api)
        .merge(openapi::create_openapi_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
}
