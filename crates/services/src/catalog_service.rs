use std::sync::Arc;

use storage::repository::{NewWordRecord, StorageError, WordRepository};
use vocab_core::{
    Clock,
    model::{Word, WordDraft, WordId, WordStatus},
};

use crate::error::CatalogServiceError;

/// Orchestrates word catalog maintenance.
///
/// A thin layer: validation happens at the draft boundary, everything
/// else delegates to the repository.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    words: Arc<dyn WordRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, words: Arc<dyn WordRepository>) -> Self {
        Self { clock, words }
    }

    /// Validate a draft and persist it as a new active word.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Word` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_word(&self, draft: WordDraft) -> Result<Word, CatalogServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let id = self
            .words
            .insert_word(NewWordRecord::from_validated(validated.clone()))
            .await?;
        Ok(validated.assign_id(id))
    }

    /// Persist an update to an existing word, re-running draft validation
    /// on the mutable text fields.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Word` for validation failures, and
    /// `CatalogServiceError::Storage` (`NotFound`) if the word is gone.
    pub async fn update_word(&self, word: &Word) -> Result<(), CatalogServiceError> {
        WordDraft::new(word.term.clone(), word.definition.clone())
            .validate(self.clock.now())?;
        self.words.update_word(word).await?;
        Ok(())
    }

    /// Retire a word from review without touching its history.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` (`NotFound`) if the word
    /// does not exist.
    pub async fn deactivate_word(&self, id: WordId) -> Result<Word, CatalogServiceError> {
        let mut word = self
            .words
            .get_word(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        word.status = WordStatus::Inactive;
        self.words.update_word(&word).await?;
        Ok(word)
    }

    /// Delete a word; its progress records and attempt logs go with it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` (`NotFound`) if the word
    /// does not exist.
    pub async fn delete_word(&self, id: WordId) -> Result<(), CatalogServiceError> {
        self.words.delete_word(id).await?;
        log::info!("deleted word {id} and its history");
        Ok(())
    }

    /// Fetch one word.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_word(&self, id: WordId) -> Result<Option<Word>, CatalogServiceError> {
        Ok(self.words.get_word(id).await?)
    }

    /// The whole catalog, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_words(&self) -> Result<Vec<Word>, CatalogServiceError> {
        Ok(self.words.list_words().await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use vocab_core::model::WordValidationError;
    use vocab_core::time::fixed_clock;

    fn service(repo: InMemoryRepository) -> CatalogService {
        CatalogService::new(fixed_clock(), Arc::new(repo))
    }

    #[tokio::test]
    async fn create_word_assigns_id_and_activates() {
        let service = service(InMemoryRepository::new());
        let word = service
            .create_word(
                WordDraft::new("Ephemeral", "Lasting for a very short time.")
                    .with_part_of_speech("Adjective"),
            )
            .await
            .unwrap();

        assert!(word.is_active());
        let fetched = service.get_word(word.id).await.unwrap().unwrap();
        assert_eq!(fetched, word);
    }

    #[tokio::test]
    async fn create_word_rejects_blank_term() {
        let service = service(InMemoryRepository::new());
        let err = service
            .create_word(WordDraft::new("  ", "definition"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Word(WordValidationError::BlankTerm)
        ));
    }

    #[tokio::test]
    async fn update_word_rejects_blank_definition() {
        let service = service(InMemoryRepository::new());
        let mut word = service
            .create_word(WordDraft::new("Lucid", "Expressed clearly."))
            .await
            .unwrap();

        word.definition = " ".into();
        let err = service.update_word(&word).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Word(WordValidationError::BlankDefinition)
        ));
    }

    #[tokio::test]
    async fn deactivate_word_retires_it() {
        let service = service(InMemoryRepository::new());
        let word = service
            .create_word(WordDraft::new("Tenacious", "Holding firmly."))
            .await
            .unwrap();

        let retired = service.deactivate_word(word.id).await.unwrap();
        assert!(!retired.is_active());

        let err = service.deactivate_word(WordId::new(404)).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Storage(StorageError::NotFound)
        ));
    }
}
