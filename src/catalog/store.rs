//! Book persistence.

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{Instrument, info_span};

use super::model::{Book, NewBook};
use crate::auth::StoreError;

#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, oldest first.
    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError>;

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Replace title and price. Returns `false` when the book does not exist.
    async fn update(&self, id: i64, book: NewBook) -> Result<bool, StoreError>;

    /// Remove a book. Returns `false` when there was nothing to delete.
    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Shelf {
    last_id: i64,
    books: BTreeMap<i64, Book>,
}

#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    shelf: RwLock<Shelf>,
}

impl InMemoryBookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.shelf.read().await.books.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        Ok(self.shelf.read().await.books.get(&id).cloned())
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut shelf = self.shelf.write().await;
        shelf.last_id += 1;
        let book = Book {
            id: shelf.last_id,
            title: book.title,
            price: book.price,
        };
        shelf.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i64, book: NewBook) -> Result<bool, StoreError> {
        let mut shelf = self.shelf.write().await;
        match shelf.books.get_mut(&id) {
            Some(existing) => {
                existing.title = book.title;
                existing.price = book.price;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.shelf.write().await.books.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Book store backed by the `books` table.
#[derive(Clone, Debug)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn book_from_row(row: &sqlx::postgres::PgRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        price: row.get("price"),
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let query = "SELECT id, title, price FROM books ORDER BY id";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;
        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let query = "SELECT id, title, price FROM books WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let query = "INSERT INTO books (title, price) VALUES ($1, $2) RETURNING id, title, price";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&book.title)
            .bind(book.price)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        Ok(book_from_row(&row))
    }

    async fn update(&self, id: i64, book: NewBook) -> Result<bool, StoreError> {
        let query = "UPDATE books SET title = $1, price = $2 WHERE id = $3";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&book.title)
            .bind(book.price)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let query = "DELETE FROM books WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
