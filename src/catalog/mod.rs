//! The books catalogue: validated title/price records and their stores.

mod model;
mod store;

pub use model::{
    Book, BookForm, DEFAULT_PRICE_LIMIT, FieldError, MAX_PRICE_LIMIT, NewBook, TITLE_MAX_CHARS,
};
pub use store::{BookStore, InMemoryBookStore, PgBookStore};
