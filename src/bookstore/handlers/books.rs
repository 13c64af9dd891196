//! Catalogue listing and the admin add/edit/delete forms.

use axum::{
    Form, Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::StoreError,
    bookstore::AppState,
    catalog::{Book, BookForm, FieldError},
};

const BOOKS: &str = "/books";

/// Form model for the add/edit pages. `errors` is empty until a submission fails.
#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct BookFormView {
    pub id: Option<i64>,
    pub book: BookForm,
    pub errors: Vec<FieldError>,
}

impl BookFormView {
    fn rejected(id: Option<i64>, book: BookForm, errors: Vec<FieldError>) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Self { id, book, errors }),
        )
            .into_response()
    }
}

fn store_failure(err: &StoreError) -> Response {
    error!("Book store error: {err:?}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/books",
    responses (
        (status = 200, description = "All books in insertion order", body = [Book]),
        (status = 500, description = "Book store unavailable")
    ),
    tag = "books",
)]
pub async fn list_books(state: Extension<Arc<AppState>>) -> Response {
    match state.books().find_all().await {
        Ok(books) => Json(books).into_response(),
        Err(err) => store_failure(&err),
    }
}

#[utoipa::path(
    get,
    path = "/books/add",
    responses (
        (status = 200, description = "Empty add form", body = BookFormView)
    ),
    tag = "books",
)]
pub async fn add_form() -> impl IntoResponse {
    Json(BookFormView {
        id: None,
        book: BookForm::default(),
        errors: Vec::new(),
    })
}

#[utoipa::path(
    post,
    path = "/books/add",
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Book saved, redirect to /books"),
        (status = 422, description = "Validation failed", body = BookFormView)
    ),
    tag = "books",
)]
#[instrument(skip(state))]
pub async fn add_book(state: Extension<Arc<AppState>>, Form(form): Form<BookForm>) -> Response {
    let book = match form.validate(state.config().price_limit()) {
        Ok(book) => book,
        Err(errors) => {
            debug!("Rejected book form with {} error(s)", errors.len());
            return BookFormView::rejected(None, form, errors);
        }
    };

    match state.books().insert(book).await {
        Ok(book) => {
            info!(id = book.id, "Book added");
            Redirect::to(BOOKS).into_response()
        }
        Err(err) => store_failure(&err),
    }
}

#[utoipa::path(
    get,
    path = "/books/edit/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses (
        (status = 200, description = "Edit form prefilled with the book", body = BookFormView),
        (status = 303, description = "No such book, redirect to /books")
    ),
    tag = "books",
)]
pub async fn edit_form(state: Extension<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.books().find_by_id(id).await {
        Ok(Some(book)) => Json(BookFormView {
            id: Some(book.id),
            book: BookForm::from(&book),
            errors: Vec::new(),
        })
        .into_response(),
        Ok(None) => Redirect::to(BOOKS).into_response(),
        Err(err) => store_failure(&err),
    }
}

#[utoipa::path(
    post,
    path = "/books/edit/{id}",
    params(("id" = i64, Path, description = "Book id")),
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Book updated, redirect to /books"),
        (status = 422, description = "Validation failed", body = BookFormView)
    ),
    tag = "books",
)]
#[instrument(skip(state))]
pub async fn update_book(
    state: Extension<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<BookForm>,
) -> Response {
    let book = match form.validate(state.config().price_limit()) {
        Ok(book) => book,
        Err(errors) => return BookFormView::rejected(Some(id), form, errors),
    };

    match state.books().update(id, book).await {
        Ok(true) => {
            info!(id, "Book updated");
            Redirect::to(BOOKS).into_response()
        }
        Ok(false) => {
            debug!(id, "Update for missing book ignored");
            Redirect::to(BOOKS).into_response()
        }
        Err(err) => store_failure(&err),
    }
}

#[utoipa::path(
    get,
    path = "/books/delete/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses (
        (status = 303, description = "Book deleted (or already absent), redirect to /books")
    ),
    tag = "books",
)]
#[instrument(skip(state))]
pub async fn delete_book(state: Extension<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.books().delete_by_id(id).await {
        Ok(deleted) => {
            if deleted {
                info!(id, "Book deleted");
            }
            Redirect::to(BOOKS).into_response()
        }
        Err(err) => store_failure(&err),
    }
}
