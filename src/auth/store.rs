//! Credential lookup backends.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::Instrument;

use super::error::StoreError;
use super::model::CredentialRecord;

/// Read-only access to persisted users.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by exact identity name.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store cannot be reached.
    async fn find_by_identity(&self, identity: &str)
        -> Result<Option<CredentialRecord>, StoreError>;
}

/// Outcome of seeding a new user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    Conflict,
}

/// Credential store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: CredentialRecord) -> CreateUserOutcome {
        let mut records = self.records.write().await;
        if records.contains_key(&record.identity) {
            return CreateUserOutcome::Conflict;
        }
        records.insert(record.identity.clone(), record);
        CreateUserOutcome::Created
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identity(
        &self,
        identity: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.get(identity).cloned())
    }
}

/// Credential store backed by the `users` and `roles` tables.
#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user, creating the role row on first use.
    ///
    /// # Errors
    /// Returns [`StoreError`] if any statement fails for a reason other than a
    /// duplicate user name.
    pub async fn create_user(
        &self,
        identity: &str,
        password_hash: &str,
        role_name: &str,
    ) -> Result<CreateUserOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = r"
            INSERT INTO roles (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let role_id: i64 = sqlx::query(query)
            .bind(role_name)
            .fetch_one(&mut *tx)
            .instrument(span)
            .await?
            .get("id");

        let query = r"
            INSERT INTO users (name, password_hash, role_id)
            VALUES ($1, $2, $3)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(identity)
            .bind(password_hash)
            .bind(role_id)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(CreateUserOutcome::Created)
            }
            Err(err) if is_unique_violation(&err) => {
                let _ = tx.rollback().await;
                Ok(CreateUserOutcome::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identity(
        &self,
        identity: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        // LEFT JOIN so a dangling role reference surfaces as a missing role.
        let query = r"
            SELECT users.name, users.password_hash, roles.name AS role
            FROM users
            LEFT JOIN roles ON roles.id = users.role_id
            WHERE users.name = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identity)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| CredentialRecord {
            identity: row.get("name"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
        }))
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
