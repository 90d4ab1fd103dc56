//! Error types for the persistence layer.

/// Errors that can occur in the database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The checkpoint retries were exhausted; the day must not commit.
    #[error("checkpoint retries exhausted: {0}")]
    RetriesExhausted(String),

    /// Persisted state is inconsistent and cannot be loaded.
    #[error("corrupt persisted state: {0}")]
    Corrupt(String),
}
