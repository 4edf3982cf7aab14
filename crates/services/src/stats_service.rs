use std::collections::BTreeMap;

use serde::Serialize;

use storage::repository::{ProgressRepository, WordRepository};
use vocab_core::model::{ProgressRecord, UserId, progress::MAX_LEVEL};

use crate::error::StatsServiceError;

//
// ─── SUMMARY TYPES ─────────────────────────────────────────────────────────────
//

/// System-wide rollup of catalog size and learning activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemSummary {
    pub total_words: u32,
    pub total_attempts: u64,
    /// Records at the top mastery level.
    pub mastered_count: u32,
    /// Records past level 1 but not yet mastered.
    pub learning_count: u32,
    /// Record counts per mastery level, index 0 holding level 1.
    pub level_counts: [u32; MAX_LEVEL as usize],
}

/// Per-learner rollup across that learner's progress records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub user_id: UserId,
    pub mastered_count: u32,
    pub learning_count: u32,
    pub total_attempts: u64,
    pub total_correct: u64,
    /// Percentage of correct attempts, 0 when nothing was attempted.
    pub accuracy: f64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only aggregation over progress records. A consumer of the core,
/// not part of it: nothing here feeds back into scheduling.
pub struct StatsService;

fn accuracy(total_correct: u64, total_attempts: u64) -> f64 {
    if total_attempts == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = total_correct as f64 / total_attempts as f64;
    ratio * 100.0
}

impl StatsService {
    /// Roll up every learner's progress into one system summary.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn system_summary(
        words: &dyn WordRepository,
        progress: &dyn ProgressRepository,
    ) -> Result<SystemSummary, StatsServiceError> {
        let (all_words, records) =
            tokio::try_join!(words.list_words(), progress.list_all())?;

        let mut summary = SystemSummary {
            total_words: u32::try_from(all_words.len()).unwrap_or(u32::MAX),
            total_attempts: 0,
            mastered_count: 0,
            learning_count: 0,
            level_counts: [0; MAX_LEVEL as usize],
        };

        for record in &records {
            summary.total_attempts += u64::from(record.total_attempts);
            summary.level_counts[usize::from(record.level) - 1] += 1;
            if record.level >= MAX_LEVEL {
                summary.mastered_count += 1;
            } else if record.level > 1 {
                summary.learning_count += 1;
            }
        }

        Ok(summary)
    }

    /// Roll up progress per learner, over every user id present in the
    /// progress store. Ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn student_summaries(
        progress: &dyn ProgressRepository,
    ) -> Result<Vec<StudentSummary>, StatsServiceError> {
        let records = progress.list_all().await?;

        let mut by_user: BTreeMap<UserId, Vec<ProgressRecord>> = BTreeMap::new();
        for record in records {
            by_user
                .entry(record.user_id.clone())
                .or_default()
                .push(record);
        }

        Ok(by_user
            .into_iter()
            .map(|(user_id, records)| {
                let mut summary = StudentSummary {
                    user_id,
                    mastered_count: 0,
                    learning_count: 0,
                    total_attempts: 0,
                    total_correct: 0,
                    accuracy: 0.0,
                };
                for record in &records {
                    if record.level >= MAX_LEVEL {
                        summary.mastered_count += 1;
                    } else if record.level > 1 {
                        summary.learning_count += 1;
                    }
                    summary.total_attempts += u64::from(record.total_attempts);
                    summary.total_correct += u64::from(record.total_correct);
                }
                summary.accuracy = accuracy(summary.total_correct, summary.total_attempts);
                summary
            })
            .collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
