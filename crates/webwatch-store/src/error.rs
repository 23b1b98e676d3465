use thiserror::Error;

/// Errors that can occur within the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key has never been written (or was deleted).
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
