use chrono::{DateTime, Utc};

use storage::repository::{AttemptPersistence, ProgressRepository, StorageError, WordRepository};
use vocab_core::{
    Clock, Scheduler,
    model::{AttemptFacts, Confidence, ProgressRecord, UserId, WordId},
};

use crate::error::ReviewServiceError;

/// How many times a lost version race is retried before the conflict is
/// surfaced to the caller.
const MAX_CONFLICT_RETRIES: u32 = 3;

//
// ─── ATTEMPT REQUEST ───────────────────────────────────────────────────────────
//

/// Raw attempt payload as received from a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRequest {
    pub word_id: WordId,
    pub question_type: String,
    pub is_correct: bool,
    pub confidence: u8,
    pub response_time_sec: Option<u32>,
}

/// Result of a recorded attempt: the rewritten progress record and the ID
/// of the appended audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAttempt {
    pub progress: ProgressRecord,
    pub log_id: i64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates recording a learner's attempt: validation, scheduling, and
/// the atomic read-compute-write cycle against storage.
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Create a review service with the real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record one attempt for `(user_id, request.word_id)`.
    ///
    /// Validation happens first and nothing is written when it fails:
    /// confidence must parse into its 0..=5 range, the question type must
    /// not be blank, and the word must exist in the catalog. The attempt
    /// is then applied through the scheduler and persisted with a
    /// compare-and-swap on the record's version; losing the race to a
    /// concurrent attempt on the same key re-reads and recomputes, up to
    /// [`MAX_CONFLICT_RETRIES`] times. Attempts are never deduplicated:
    /// recording the same payload twice counts two attempts.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Attempt` for invalid payloads,
    /// `ReviewServiceError::UnknownWord` for an unknown word ID, and
    /// `ReviewServiceError::Storage` for persistence failures (including
    /// a conflict that survived the retry budget).
    pub async fn record_attempt(
        &self,
        user_id: &UserId,
        request: AttemptRequest,
        words: &dyn WordRepository,
        progress: &dyn ProgressRepository,
        attempts: &dyn AttemptPersistence,
    ) -> Result<RecordedAttempt, ReviewServiceError> {
        let confidence = Confidence::from_u8(request.confidence)?;
        let facts = AttemptFacts::new(
            request.question_type,
            request.is_correct,
            confidence,
            request.response_time_sec.unwrap_or(0),
        )?;

        if words.get_word(request.word_id).await?.is_none() {
            return Err(ReviewServiceError::UnknownWord(request.word_id));
        }

        let mut conflicts = 0;
        loop {
            let prior = progress.get_progress(user_id, request.word_id).await?;
            let expected_version = prior.as_ref().map(|vp| vp.version);

            let applied = self.scheduler.apply_attempt(
                user_id,
                request.word_id,
                prior.as_ref().map(|vp| &vp.record),
                &facts,
                self.now(),
            );

            match attempts
                .apply_attempt(expected_version, &applied.progress, &applied.log)
                .await
            {
                Ok(log_id) => {
                    return Ok(RecordedAttempt {
                        progress: applied.progress,
                        log_id,
                    });
                }
                Err(StorageError::Conflict) if conflicts < MAX_CONFLICT_RETRIES => {
                    conflicts += 1;
                    log::debug!(
                        "attempt on {}/{} lost a version race, retry {conflicts}",
                        user_id,
                        request.word_id
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Default for ReviewService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::repository::{InMemoryRepository, NewWordRecord, VersionedProgress};
    use vocab_core::model::{AttemptError, AttemptLog, WordDraft};
    use vocab_core::time::{fixed_clock, fixed_now};

    async fn seed_word(repo: &InMemoryRepository, term: &str) -> WordId {
        let validated = WordDraft::new(term, "a definition")
            .validate(fixed_now())
            .unwrap();
        repo.insert_word(NewWordRecord::from_validated(validated))
            .await
            .unwrap()
    }

    fn request(word_id: WordId, is_correct: bool, confidence: u8) -> AttemptRequest {
        AttemptRequest {
            word_id,
            question_type: "multiple_choice".into(),
            is_correct,
            confidence,
            response_time_sec: Some(9),
        }
    }

    #[tokio::test]
    async fn first_attempt_creates_record_and_log() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "diligent").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        let recorded = service
            .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &repo)
            .await
            .unwrap();

        assert_eq!(recorded.progress.total_attempts, 1);
        assert_eq!(recorded.progress.level, 1);
        assert_eq!(recorded.progress.easiness_factor, 2.5);
        assert_eq!(recorded.progress.first_learned_date, fixed_now());

        let logs = repo.logs_for_word(&user, word_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, Some(recorded.log_id));
        assert_eq!(logs[0].entry.level_at_attempt, 1);
    }

    #[tokio::test]
    async fn identical_attempts_both_count() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "tenacious").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        for expected_attempts in 1..=2 {
            let recorded = service
                .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &repo)
                .await
                .unwrap();
            assert_eq!(recorded.progress.total_attempts, expected_attempts);
        }

        let logs = repo.logs_for_word(&user, word_id).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn invalid_confidence_is_rejected_before_any_write() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "lucid").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        let err = service
            .record_attempt(&user, request(word_id, true, 6), &repo, &repo, &repo)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewServiceError::Attempt(AttemptError::ConfidenceOutOfRange(6))
        ));

        assert!(repo.get_progress(&user, word_id).await.unwrap().is_none());
        assert!(repo.logs_for_word(&user, word_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_question_type_is_rejected() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "lucid").await;
        let service = ReviewService::new().with_clock(fixed_clock());

        let mut bad = request(word_id, true, 4);
        bad.question_type = "   ".into();
        let err = service
            .record_attempt(&UserId::new("u-1"), bad, &repo, &repo, &repo)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewServiceError::Attempt(AttemptError::BlankQuestionType)
        ));
    }

    #[tokio::test]
    async fn unknown_word_is_rejected_without_mutation() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        let missing = WordId::new(404);
        let err = service
            .record_attempt(&user, request(missing, true, 4), &repo, &repo, &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewServiceError::UnknownWord(id) if id == missing));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_resets_streak_through_the_service() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "benevolent").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        for _ in 0..3 {
            service
                .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &repo)
                .await
                .unwrap();
        }
        let recorded = service
            .record_attempt(&user, request(word_id, false, 2), &repo, &repo, &repo)
            .await
            .unwrap();

        assert_eq!(recorded.progress.consecutive_correct, 0);
        assert_eq!(recorded.progress.level, 1);
        assert_eq!(recorded.progress.total_attempts, 4);
        assert_eq!(recorded.progress.total_correct, 3);
        assert!((recorded.progress.easiness_factor - 1.7).abs() < 1e-9);
    }

    /// Persistence wrapper that reports a conflict for the first N writes,
    /// as if a concurrent attempt had bumped the version in between.
    struct ContendedPersistence<'a> {
        inner: &'a InMemoryRepository,
        remaining_conflicts: AtomicU32,
    }

    #[async_trait]
    impl AttemptPersistence for ContendedPersistence<'_> {
        async fn apply_attempt(
            &self,
            expected_version: Option<i64>,
            progress: &ProgressRecord,
            log: &AttemptLog,
        ) -> Result<i64, StorageError> {
            if self
                .remaining_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::Conflict);
            }
            self.inner
                .apply_attempt(expected_version, progress, log)
                .await
        }
    }

    #[tokio::test]
    async fn version_race_is_retried_then_succeeds() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "ephemeral").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        let contended = ContendedPersistence {
            inner: &repo,
            remaining_conflicts: AtomicU32::new(2),
        };

        let recorded = service
            .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &contended)
            .await
            .unwrap();
        assert_eq!(recorded.progress.total_attempts, 1);
    }

    #[tokio::test]
    async fn persistent_conflict_is_surfaced_after_retry_budget() {
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "ephemeral").await;
        let service = ReviewService::new().with_clock(fixed_clock());

        let contended = ContendedPersistence {
            inner: &repo,
            remaining_conflicts: AtomicU32::new(u32::MAX),
        };

        let err = service
            .record_attempt(
                &UserId::new("u-1"),
                request(word_id, true, 5),
                &repo,
                &repo,
                &contended,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewServiceError::Storage(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn interleaved_snapshots_converge_with_retries() {
        // Simulate two attempts racing on the same key: both read version 1,
        // the loser's CAS fails and its retry folds in the winner's update.
        let repo = InMemoryRepository::new();
        let word_id = seed_word(&repo, "diligent").await;
        let user = UserId::new("u-1");
        let service = ReviewService::new().with_clock(fixed_clock());

        service
            .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &repo)
            .await
            .unwrap();

        let snapshot: VersionedProgress = repo
            .get_progress(&user, word_id)
            .await
            .unwrap()
            .unwrap();

        // Winner lands directly from the snapshot.
        let scheduler = Scheduler::new();
        let facts = AttemptFacts::new(
            "multiple_choice",
            true,
            Confidence::from_u8(5).unwrap(),
            9,
        )
        .unwrap();
        let winner = scheduler.apply_attempt(
            &user,
            word_id,
            Some(&snapshot.record),
            &facts,
            fixed_now(),
        );
        repo.apply_attempt(Some(snapshot.version), &winner.progress, &winner.log)
            .await
            .unwrap();

        // The service re-reads and lands on top instead of overwriting.
        let recorded = service
            .record_attempt(&user, request(word_id, true, 5), &repo, &repo, &repo)
            .await
            .unwrap();
        assert_eq!(recorded.progress.total_attempts, 3);
        assert_eq!(repo.logs_for_word(&user, word_id).await.unwrap().len(), 3);
    }
}
