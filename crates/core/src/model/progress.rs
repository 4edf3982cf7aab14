use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{UserId, WordId};

/// Lower bound for the easiness factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Upper bound for the easiness factor; also the default for new records.
pub const MAX_EASE_FACTOR: f64 = 2.5;
/// Easiness factor assigned before any attempt has been recorded.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Highest mastery level a learner can reach on a word.
pub const MAX_LEVEL: u8 = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Invariant violations detected when reconstructing a record from storage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProgressError {
    #[error("mastery level must be in [1, {MAX_LEVEL}], got {0}")]
    LevelOutOfRange(u8),

    #[error("easiness factor must be in [{MIN_EASE_FACTOR}, {MAX_EASE_FACTOR}], got {0}")]
    EaseFactorOutOfRange(f64),

    #[error("total_correct ({correct}) exceeds total_attempts ({attempts})")]
    InconsistentCounters { correct: u32, attempts: u32 },
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Scheduling state for one (learner, word) pair.
///
/// Created lazily on the first recorded attempt and rewritten on every
/// attempt after that. Invariants:
///
/// - `1 <= level <= 5`
/// - `1.3 <= easiness_factor <= 2.5`
/// - `total_correct <= total_attempts`
/// - `first_learned_date` is set at creation and never changes
///
/// `next_review_date` of `None` means the word has not been scheduled yet;
/// such a record counts as due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub word_id: WordId,
    pub level: u8,
    pub total_attempts: u32,
    pub total_correct: u32,
    pub easiness_factor: f64,
    pub consecutive_correct: u32,
    pub last_attempt_date: Option<DateTime<Utc>>,
    pub first_learned_date: DateTime<Utc>,
    pub next_review_date: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Reconstruct a record from persisted fields, checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a stored field is outside its invariant
    /// range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        word_id: WordId,
        level: u8,
        total_attempts: u32,
        total_correct: u32,
        easiness_factor: f64,
        consecutive_correct: u32,
        last_attempt_date: Option<DateTime<Utc>>,
        first_learned_date: DateTime<Utc>,
        next_review_date: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        if !(1..=MAX_LEVEL).contains(&level) {
            return Err(ProgressError::LevelOutOfRange(level));
        }
        if !(MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&easiness_factor) {
            return Err(ProgressError::EaseFactorOutOfRange(easiness_factor));
        }
        if total_correct > total_attempts {
            return Err(ProgressError::InconsistentCounters {
                correct: total_correct,
                attempts: total_attempts,
            });
        }

        Ok(Self {
            user_id,
            word_id,
            level,
            total_attempts,
            total_correct,
            easiness_factor,
            consecutive_correct,
            last_attempt_date,
            first_learned_date,
            next_review_date,
        })
    }

    /// A record is due when it was never scheduled or its scheduled time
    /// has arrived.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date.is_none_or(|at| at <= now)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
