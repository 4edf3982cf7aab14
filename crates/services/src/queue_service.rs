use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::{ProgressRepository, WordRepository};
use vocab_core::{
    Clock,
    model::{ProgressRecord, UserId, Word, WordId},
};

use crate::error::QueueServiceError;

//
// ─── QUEUE ENTRY ───────────────────────────────────────────────────────────────
//

/// One entry in a learner's review queue: the word to show, plus any
/// existing progress (`None` for a never-attempted word).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub word: Word,
    pub progress: Option<ProgressRecord>,
}

//
// ─── DUE SELECTION ─────────────────────────────────────────────────────────────
//

/// Select the due subset of `words` for one learner.
///
/// An active word is due when it has no progress record, when its record
/// was never scheduled, or when the scheduled time has arrived. Inactive
/// words and repeated IDs are skipped. The result carries no ordering
/// guarantee.
#[must_use]
pub fn select_due(
    words: Vec<Word>,
    progress_by_word: &HashMap<WordId, ProgressRecord>,
    now: DateTime<Utc>,
) -> Vec<QueueEntry> {
    let mut seen = HashSet::new();

    words
        .into_iter()
        .filter(|word| word.is_active() && seen.insert(word.id))
        .filter_map(|word| match progress_by_word.get(&word.id) {
            None => Some(QueueEntry {
                word,
                progress: None,
            }),
            Some(record) if record.is_due(now) => Some(QueueEntry {
                word,
                progress: Some(record.clone()),
            }),
            Some(_) => None,
        })
        .collect()
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Storage-backed review-queue and progress queries for one learner.
pub struct QueueService {
    clock: Clock,
}

impl QueueService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The words currently due for review by `user_id`.
    ///
    /// The catalog read and the progress read are independent, so they
    /// are issued concurrently and merged locally; no locks are held.
    ///
    /// # Errors
    ///
    /// Returns `QueueServiceError::Storage` if either read fails.
    pub async fn review_queue(
        &self,
        user_id: &UserId,
        words: &dyn WordRepository,
        progress: &dyn ProgressRepository,
    ) -> Result<Vec<QueueEntry>, QueueServiceError> {
        let (active, records) = tokio::try_join!(
            words.list_active_words(),
            progress.list_for_user(user_id)
        )?;

        let by_word: HashMap<WordId, ProgressRecord> = records
            .into_iter()
            .map(|record| (record.word_id, record))
            .collect();

        Ok(select_due(active, &by_word, self.clock.now()))
    }

    /// Every word the learner has a progress record for, paired with it.
    ///
    /// Words without a record are not included; words removed from the
    /// catalog have no surviving records to pair (deletes cascade).
    ///
    /// # Errors
    ///
    /// Returns `QueueServiceError::Storage` if either read fails.
    pub async fn progress_overview(
        &self,
        user_id: &UserId,
        words: &dyn WordRepository,
        progress: &dyn ProgressRepository,
    ) -> Result<Vec<(Word, ProgressRecord)>, QueueServiceError> {
        let (all_words, records) =
            tokio::try_join!(words.list_words(), progress.list_for_user(user_id))?;

        let by_id: HashMap<WordId, Word> =
            all_words.into_iter().map(|word| (word.id, word)).collect();

        Ok(records
            .into_iter()
            .filter_map(|record| {
                by_id
                    .get(&record.word_id)
                    .cloned()
                    .map(|word| (word, record))
            })
            .collect())
    }
}

impl Default for QueueService {
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
    use chrono::Duration;
    use storage::repository::{
        AttemptPersistence, InMemoryRepository, NewWordRecord, WordRepository,
    };
    use vocab_core::Scheduler;
    use vocab_core::model::{AttemptFacts, Confidence, WordDraft, WordStatus};
    use vocab_core::time::{fixed_clock, fixed_now};

    fn build_word(id: u64, status: WordStatus) -> Word {
        let mut word = WordDraft::new(format!("word-{id}"), "a definition")
            .validate(fixed_now())
            .unwrap()
            .assign_id(WordId::new(id));
        word.status = status;
        word
    }

    fn record_with_review_at(word_id: WordId, at: Option<DateTime<Utc>>) -> ProgressRecord {
        ProgressRecord::from_persisted(
            UserId::new("u-1"),
            word_id,
            1,
            1,
            1,
            2.5,
            1,
            Some(fixed_now()),
            fixed_now(),
            at,
        )
        .unwrap()
    }

    fn progress_map(records: Vec<ProgressRecord>) -> HashMap<WordId, ProgressRecord> {
        records.into_iter().map(|r| (r.word_id, r)).collect()
    }

    #[test]
    fn never_attempted_words_are_due() {
        let entries = select_due(
            vec![build_word(1, WordStatus::Active)],
            &HashMap::new(),
            fixed_now(),
        );
        assert_eq!(entries.len(), 1);
        assert!(entries[0].progress.is_none());
    }

    #[test]
    fn unscheduled_records_are_due() {
        let word = build_word(1, WordStatus::Active);
        let progress = progress_map(vec![record_with_review_at(word.id, None)]);

        let entries = select_due(vec![word], &progress, fixed_now());
        assert_eq!(entries.len(), 1);
        assert!(entries[0].progress.is_some());
    }

    #[test]
    fn inclusion_follows_the_review_date_boundary() {
        let now = fixed_now();
        let due = build_word(1, WordStatus::Active);
        let exactly = build_word(2, WordStatus::Active);
        let future = build_word(3, WordStatus::Active);

        let progress = progress_map(vec![
            record_with_review_at(due.id, Some(now - Duration::days(1))),
            record_with_review_at(exactly.id, Some(now)),
            record_with_review_at(future.id, Some(now + Duration::seconds(1))),
        ]);

        let entries = select_due(vec![due, exactly, future], &progress, now);
        let ids: HashSet<WordId> = entries.iter().map(|e| e.word.id).collect();
        assert_eq!(
            ids,
            HashSet::from([WordId::new(1), WordId::new(2)])
        );
    }

    #[test]
    fn inactive_words_are_excluded() {
        let entries = select_due(
            vec![
                build_word(1, WordStatus::Inactive),
                build_word(2, WordStatus::Active),
            ],
            &HashMap::new(),
            fixed_now(),
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word.id, WordId::new(2));
    }

    #[test]
    fn repeated_ids_yield_one_entry() {
        let entries = select_due(
            vec![
                build_word(1, WordStatus::Active),
                build_word(1, WordStatus::Active),
            ],
            &HashMap::new(),
            fixed_now(),
        );
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn selection_matches_inclusion_rule_for_generated_inputs() {
        // Sweep a grid of (status, progress presence, review offset) and
        // check every word lands on the right side of the rule.
        let now = fixed_now();
        let mut words = Vec::new();
        let mut progress = HashMap::new();
        let mut expected_due = HashSet::new();

        let mut id = 0u64;
        for status in [WordStatus::Active, WordStatus::Inactive] {
            for offset_days in [None, Some(-3i64), Some(0), Some(3)] {
                id += 1;
                let word = build_word(id, status);
                let included = match offset_days {
                    None => true,
                    Some(days) => {
                        let at = now + Duration::days(days);
                        progress.insert(
                            word.id,
                            record_with_review_at(word.id, Some(at)),
                        );
                        days <= 0
                    }
                };
                if status == WordStatus::Active && included {
                    expected_due.insert(word.id);
                }
                words.push(word);
            }
        }

        let entries = select_due(words, &progress, now);
        let got: HashSet<WordId> = entries.iter().map(|e| e.word.id).collect();
        assert_eq!(got, expected_due);
        assert_eq!(entries.len(), got.len());
    }

    async fn seed_catalog(repo: &InMemoryRepository) -> (WordId, WordId) {
        let first = repo
            .insert_word(NewWordRecord::from_validated(
                WordDraft::new("diligent", "careful").validate(fixed_now()).unwrap(),
            ))
            .await
            .unwrap();
        let second = repo
            .insert_word(NewWordRecord::from_validated(
                WordDraft::new("lucid", "clear").validate(fixed_now()).unwrap(),
            ))
            .await
            .unwrap();
        (first, second)
    }

    #[tokio::test]
    async fn review_queue_drops_words_scheduled_in_the_future() {
        let repo = InMemoryRepository::new();
        let (attempted, fresh) = seed_catalog(&repo).await;
        let user = UserId::new("u-1");

        // A strong first answer schedules the word one day out.
        let facts =
            AttemptFacts::new("flashcard", true, Confidence::from_u8(5).unwrap(), 3).unwrap();
        let applied =
            Scheduler::new().apply_attempt(&user, attempted, None, &facts, fixed_now());
        repo.apply_attempt(None, &applied.progress, &applied.log)
            .await
            .unwrap();

        let service = QueueService::new().with_clock(fixed_clock());
        let queue = service.review_queue(&user, &repo, &repo).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].word.id, fresh);

        // A day later the reviewed word is back.
        let later = QueueService::new()
            .with_clock(Clock::fixed(fixed_now() + Duration::days(1)));
        let queue = later.review_queue(&user, &repo, &repo).await.unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn progress_overview_only_lists_attempted_words() {
        let repo = InMemoryRepository::new();
        let (attempted, _fresh) = seed_catalog(&repo).await;
        let user = UserId::new("u-1");

        let facts =
            AttemptFacts::new("flashcard", true, Confidence::from_u8(4).unwrap(), 3).unwrap();
        let applied =
            Scheduler::new().apply_attempt(&user, attempted, None, &facts, fixed_now());
        repo.apply_attempt(None, &applied.progress, &applied.log)
            .await
            .unwrap();

        let service = QueueService::new().with_clock(fixed_clock());
        let overview = service
            .progress_overview(&user, &repo, &repo)
            .await
            .unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].0.id, attempted);
        assert_eq!(overview[0].1.total_attempts, 1);

        // Another learner sees an empty overview.
        let other = service
            .progress_overview(&UserId::new("u-2"), &repo, &repo)
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
