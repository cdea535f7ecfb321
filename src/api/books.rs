//! Book endpoints

use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    models::book::{BookListResponse, BookQuery, BookRequest, BookResponse},
    AppState,
};

use super::{BookId, BookSearch, PrettyJson, ValidatedJson};

/// Create a new book
#[utoipa::path(
    post,
    path = "/book/create",
    tag = "books",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<BookRequest>,
) -> AppResult<(StatusCode, PrettyJson<BookResponse>)> {
    let resp = state.services.books.create_book(request).await?;
    Ok((StatusCode::CREATED, PrettyJson(resp)))
}

/// Search books by title, author and category substrings
#[utoipa::path(
    get,
    path = "/book/list",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = BookListResponse),
        (status = 400, description = "Malformed query string", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    BookSearch(query): BookSearch,
) -> AppResult<PrettyJson<BookListResponse>> {
    let resp = state.services.books.search_books(query).await?;
    Ok(PrettyJson(resp))
}

/// List all books, most borrowed first
#[utoipa::path(
    get,
    path = "/book/summary",
    tag = "books",
    responses(
        (status = 200, description = "Books ordered by borrow count", body = BookListResponse)
    )
)]
pub async fn get_most_borrowed_books(
    State(state): State<AppState>,
) -> AppResult<PrettyJson<BookListResponse>> {
    let resp = state.services.books.get_most_borrowed_books().await?;
    Ok(PrettyJson(resp))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/book/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 400, description = "Invalid id", body = crate::error::ErrorResponse),
        (status = 500, description = "Book not found or store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<PrettyJson<BookResponse>> {
    let resp = state.services.books.get_book_by_id(id).await?;
    Ok(PrettyJson(resp))
}

/// Update title, author and category of a book
#[utoipa::path(
    put,
    path = "/book/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid id or body", body = crate::error::ErrorResponse),
        (status = 500, description = "Book not found or store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    BookId(id): BookId,
    ValidatedJson(request): ValidatedJson<BookRequest>,
) -> AppResult<PrettyJson<BookResponse>> {
    let resp = state.services.books.update_book(id, request).await?;
    Ok(PrettyJson(resp))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/book/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = BookResponse),
        (status = 400, description = "Invalid id", body = crate::error::ErrorResponse),
        (status = 500, description = "Book not found or store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<PrettyJson<BookResponse>> {
    let resp = state.services.books.delete_book(id).await?;
    Ok(PrettyJson(resp))
}

/// Borrow a book
#[utoipa::path(
    patch,
    path = "/book/borrow/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book borrowed", body = BookResponse),
        (status = 400, description = "Invalid id or book already borrowed", body = crate::error::ErrorResponse),
        (status = 500, description = "Book not found or store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<PrettyJson<BookResponse>> {
    let resp = state.services.books.borrow_book(id).await?;
    Ok(PrettyJson(resp))
}

/// Return a borrowed book
#[utoipa::path(
    patch,
    path = "/book/return/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book returned", body = BookResponse),
        (status = 400, description = "Invalid id or book not borrowed", body = crate::error::ErrorResponse),
        (status = 500, description = "Book not found or store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<PrettyJson<BookResponse>> {
    let resp = state.services.books.return_book(id).await?;
    Ok(PrettyJson(resp))
}
