use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::WordId;

//
// ─── WORD STATUS ───────────────────────────────────────────────────────────────
//

/// Catalog status of a word. Inactive words stay in the catalog (and keep
/// their progress history) but are never offered for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordStatus {
    Active,
    Inactive,
}

impl WordStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WordStatus::Active => "active",
            WordStatus::Inactive => "inactive",
        }
    }
}

//
// ─── WORD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated word input, as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordDraft {
    pub term: String,
    pub definition: String,
    pub part_of_speech: Option<String>,
    pub example_sentence: Option<String>,
}

impl WordDraft {
    #[must_use]
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            part_of_speech: None,
            example_sentence: None,
        }
    }

    #[must_use]
    pub fn with_part_of_speech(mut self, part_of_speech: impl Into<String>) -> Self {
        self.part_of_speech = Some(part_of_speech.into());
        self
    }

    #[must_use]
    pub fn with_example(mut self, example_sentence: impl Into<String>) -> Self {
        self.example_sentence = Some(example_sentence.into());
        self
    }

    /// Validate the draft, trimming the term and rejecting blank fields.
    ///
    /// # Errors
    ///
    /// Returns `WordValidationError` if the term or definition is blank.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedWord, WordValidationError> {
        let term = self.term.trim();
        if term.is_empty() {
            return Err(WordValidationError::BlankTerm);
        }

        let definition = self.definition.trim();
        if definition.is_empty() {
            return Err(WordValidationError::BlankDefinition);
        }

        Ok(ValidatedWord {
            term: term.to_owned(),
            definition: definition.to_owned(),
            part_of_speech: self.part_of_speech,
            example_sentence: self.example_sentence,
            created_at: now,
        })
    }
}

/// A draft that passed validation but has not been assigned an ID yet.
///
/// IDs come from storage, so a `ValidatedWord` is what repositories accept
/// for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWord {
    pub term: String,
    pub definition: String,
    pub part_of_speech: Option<String>,
    pub example_sentence: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedWord {
    /// Attach the storage-assigned ID, producing a catalog `Word`.
    ///
    /// New words start out `Active`.
    #[must_use]
    pub fn assign_id(self, id: WordId) -> Word {
        Word {
            id,
            term: self.term,
            definition: self.definition,
            part_of_speech: self.part_of_speech,
            example_sentence: self.example_sentence,
            status: WordStatus::Active,
            created_at: self.created_at,
        }
    }
}

/// A vocabulary word in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub term: String,
    pub definition: String,
    pub part_of_speech: Option<String>,
    pub example_sentence: Option<String>,
    pub status: WordStatus,
    pub created_at: DateTime<Utc>,
}

impl Word {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WordStatus::Active
    }
}

//
// ─── WORD VALIDATION ERRORS ────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WordValidationError {
    #[error("word term must not be blank")]
    BlankTerm,

    #[error("word definition must not be blank")]
    BlankDefinition,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn word_fails_if_term_blank() {
        let err = WordDraft::new("   ", "a definition")
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, WordValidationError::BlankTerm);
    }

    #[test]
    fn word_fails_if_definition_blank() {
        let err = WordDraft::new("ephemeral", " ")
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, WordValidationError::BlankDefinition);
    }

    #[test]
    fn valid_word_validates_and_assigns_id() {
        let word = WordDraft::new("  ephemeral ", "Lasting for a very short time.")
            .with_part_of_speech("Adjective")
            .with_example("Fashions are ephemeral.")
            .validate(fixed_now())
            .unwrap()
            .assign_id(WordId::new(7));

        assert_eq!(word.id, WordId::new(7));
        assert_eq!(word.term, "ephemeral");
        assert_eq!(word.part_of_speech.as_deref(), Some("Adjective"));
        assert!(word.is_active());
    }

    #[test]
    fn inactive_word_is_not_active() {
        let mut word = WordDraft::new("lucid", "Expressed clearly.")
            .validate(fixed_now())
            .unwrap()
            .assign_id(WordId::new(1));
        word.status = WordStatus::Inactive;
        assert!(!word.is_active());
    }
}
