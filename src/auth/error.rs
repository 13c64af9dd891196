use thiserror::Error;

/// The only authentication failure a caller ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// A persisted user whose role reference is unusable. Reported to operators,
/// treated as a denial for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("user {identity} has no role assigned")]
    MissingRole { identity: String },
    #[error("user {identity} references unknown role {role:?}")]
    UnknownRole { identity: String, role: String },
}

/// Malformed authorization rule table. Fatal at start-up.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy json")]
    Json(#[from] serde_json::Error),
    #[error("rule {index} declares no patterns")]
    NoPatterns { index: usize },
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("rule {index} references unknown role {role:?}")]
    UnknownRole { index: usize, role: String },
}

/// Failure talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
