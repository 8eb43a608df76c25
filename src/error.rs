//! Crate-wide error types.

/// Top-level error for all fallible operations in the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the vector database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("lancedb error: {0}")]
    LanceDb(String),
}

/// Errors from the embedding model.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
