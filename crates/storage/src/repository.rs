use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vocab_core::model::{
    AttemptLog, ProgressRecord, UserId, ValidatedWord, Word, WordId, WordStatus,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A progress record together with its storage version.
///
/// The version is bumped on every write and drives the compare-and-swap
/// in [`AttemptPersistence::apply_attempt`]; it never leaves the storage
/// layer as anything but an opaque token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedProgress {
    pub version: i64,
    pub record: ProgressRecord,
}

/// Insert shape for a catalog word; the ID is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWordRecord {
    pub term: String,
    pub definition: String,
    pub part_of_speech: Option<String>,
    pub example_sentence: Option<String>,
    pub status: WordStatus,
    pub created_at: DateTime<Utc>,
}

impl NewWordRecord {
    #[must_use]
    pub fn from_validated(word: ValidatedWord) -> Self {
        Self {
            term: word.term,
            definition: word.definition,
            part_of_speech: word.part_of_speech,
            example_sentence: word.example_sentence,
            status: WordStatus::Active,
            created_at: word.created_at,
        }
    }
}

/// Persisted shape of an attempt-log row: the domain entry plus its
/// storage-assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLogRecord {
    pub id: Option<i64>,
    pub entry: AttemptLog,
}

impl AttemptLogRecord {
    #[must_use]
    pub fn from_entry(entry: AttemptLog) -> Self {
        Self { id: None, entry }
    }
}

/// Repository contract for the word catalog.
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Insert a new word and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn insert_word(&self, word: NewWordRecord) -> Result<WordId, StorageError>;

    /// Update an existing word. `created_at` is kept from the original
    /// insert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the word does not exist.
    async fn update_word(&self, word: &Word) -> Result<(), StorageError>;

    /// Delete a word. Progress records and attempt logs for it are
    /// removed by cascade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the word does not exist.
    async fn delete_word(&self, id: WordId) -> Result<(), StorageError>;

    /// Fetch a word by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError>;

    /// List every word in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_words(&self) -> Result<Vec<Word>, StorageError>;

    /// List only active words.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_active_words(&self) -> Result<Vec<Word>, StorageError>;
}

/// Read side of the per-(user, word) progress store and its audit log.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record for one (user, word) key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_progress(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Option<VersionedProgress>, StorageError>;

    /// List all progress records for one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>, StorageError>;

    /// List every progress record, for aggregation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_all(&self) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Attempt history for one (user, word) key, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn logs_for_word(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Vec<AttemptLogRecord>, StorageError>;
}

/// Write side of attempt recording: one atomic progress-write plus
/// log-append per attempt.
#[async_trait]
pub trait AttemptPersistence: Send + Sync {
    /// Persist the outcome of one attempt.
    ///
    /// With `expected_version: None` the record must not exist yet and is
    /// inserted at version 1; with `Some(v)` the stored row must still be
    /// at version `v` and is rewritten at `v + 1`. The log entry is
    /// appended in the same transaction, so the pair either lands
    /// together or not at all. Returns the new log row's ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the version check fails
    /// (another attempt won the race); nothing is written in that case.
    async fn apply_attempt(
        &self,
        expected_version: Option<i64>,
        progress: &ProgressRecord,
        log: &AttemptLog,
    ) -> Result<i64, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let words: Arc<dyn WordRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptPersistence> = Arc::new(repo);
        Self {
            words,
            progress,
            attempts,
        }
    }
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    next_word_id: u64,
    next_log_id: i64,
    words: HashMap<WordId, Word>,
    progress: HashMap<(UserId, WordId), VersionedProgress>,
    logs: Vec<AttemptLogRecord>,
}

/// Simple in-memory implementation for testing and prototyping.
///
/// One mutex guards all state, which trivially gives `apply_attempt` the
/// same atomicity the SQLite transaction provides.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn insert_word(&self, word: NewWordRecord) -> Result<WordId, StorageError> {
        let mut state = self.lock()?;
        state.next_word_id += 1;
        let id = WordId::new(state.next_word_id);
        state.words.insert(
            id,
            Word {
                id,
                term: word.term,
                definition: word.definition,
                part_of_speech: word.part_of_speech,
                example_sentence: word.example_sentence,
                status: word.status,
                created_at: word.created_at,
            },
        );
        Ok(id)
    }

    async fn update_word(&self, word: &Word) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let existing = state.words.get_mut(&word.id).ok_or(StorageError::NotFound)?;
        let created_at = existing.created_at;
        *existing = Word {
            created_at,
            ..word.clone()
        };
        Ok(())
    }

    async fn delete_word(&self, id: WordId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.words.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        state.progress.retain(|(_, word_id), _| *word_id != id);
        state.logs.retain(|log| log.entry.word_id != id);
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let state = self.lock()?;
        Ok(state.words.get(&id).cloned())
    }

    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let state = self.lock()?;
        Ok(state.words.values().cloned().collect())
    }

    async fn list_active_words(&self) -> Result<Vec<Word>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .words
            .values()
            .filter(|word| word.is_active())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let state = self.lock()?;
        Ok(state.progress.get(&(user_id.clone(), word_id)).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .progress
            .values()
            .filter(|vp| &vp.record.user_id == user_id)
            .map(|vp| vp.record.clone())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.progress.values().map(|vp| vp.record.clone()).collect())
    }

    async fn logs_for_word(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Vec<AttemptLogRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .logs
            .iter()
            .filter(|log| &log.entry.user_id == user_id && log.entry.word_id == word_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptPersistence for InMemoryRepository {
    async fn apply_attempt(
        &self,
        expected_version: Option<i64>,
        progress: &ProgressRecord,
        log: &AttemptLog,
    ) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        let key = (progress.user_id.clone(), progress.word_id);

        match expected_version {
            None => {
                if state.progress.contains_key(&key) {
                    return Err(StorageError::Conflict);
                }
                state.progress.insert(
                    key,
                    VersionedProgress {
                        version: 1,
                        record: progress.clone(),
                    },
                );
            }
            Some(expected) => {
                let slot = state.progress.get_mut(&key).ok_or(StorageError::Conflict)?;
                if slot.version != expected {
                    return Err(StorageError::Conflict);
                }
                *slot = VersionedProgress {
                    version: expected + 1,
                    record: progress.clone(),
                };
            }
        }

        state.next_log_id += 1;
        let log_id = state.next_log_id;
        state.logs.push(AttemptLogRecord {
            id: Some(log_id),
            entry: log.clone(),
        });
        Ok(log_id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
