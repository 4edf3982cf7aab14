//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use vocab_core::model::{AttemptError, WordId, WordValidationError};

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    /// The attempt referenced a word that is not in the catalog. Raised
    /// before anything is written.
    #[error("word {0} does not exist")]
    UnknownWord(WordId),

    #[error(transparent)]
    Attempt(#[from] AttemptError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Word(#[from] WordValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QueueService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueueServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
