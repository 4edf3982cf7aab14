use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{UserId, WordId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while validating attempt input, before any state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("confidence must be in [0, 5], got {0}")]
    ConfidenceOutOfRange(u8),

    #[error("question type must not be blank")]
    BlankQuestionType,
}

//
// ─── CONFIDENCE ────────────────────────────────────────────────────────────────
//

/// Learner-reported confidence in an answer, bounded to 0..=5.
///
/// Confidence is self-assessment, not correctness: an answer can be marked
/// incorrect while confidence stays high, and the scheduler treats that
/// combination differently from a blank miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl TryFrom<u8> for Confidence {
    type Error = AttemptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl Confidence {
    /// Highest expressible confidence.
    pub const MAX: u8 = 5;

    /// Converts a raw numeric confidence to a `Confidence`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ConfidenceOutOfRange` if the value exceeds
    /// [`Confidence::MAX`].
    pub fn from_u8(value: u8) -> Result<Self, AttemptError> {
        if value > Self::MAX {
            return Err(AttemptError::ConfidenceOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying value
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

//
// ─── ATTEMPT FACTS ─────────────────────────────────────────────────────────────
//

/// Validated facts about a single answer, as fed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFacts {
    pub question_type: String,
    pub is_correct: bool,
    pub confidence: Confidence,
    pub response_time_sec: u32,
}

impl AttemptFacts {
    /// Build attempt facts, rejecting a blank question type.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::BlankQuestionType` if `question_type` trims
    /// to nothing.
    pub fn new(
        question_type: impl Into<String>,
        is_correct: bool,
        confidence: Confidence,
        response_time_sec: u32,
    ) -> Result<Self, AttemptError> {
        let question_type = question_type.into();
        if question_type.trim().is_empty() {
            return Err(AttemptError::BlankQuestionType);
        }
        Ok(Self {
            question_type,
            is_correct,
            confidence,
            response_time_sec,
        })
    }
}

//
// ─── ATTEMPT LOG ───────────────────────────────────────────────────────────────
//

/// Immutable audit entry for one recorded attempt.
///
/// `level_at_attempt` captures the mastery level *before* the attempt was
/// applied (1 when no record existed yet). Log entries are append-only;
/// nothing in the trainer ever mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLog {
    pub user_id: UserId,
    pub word_id: WordId,
    pub attempted_at: DateTime<Utc>,
    pub question_type: String,
    pub is_correct: bool,
    pub confidence: Confidence,
    pub response_time_sec: u32,
    pub level_at_attempt: u8,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
