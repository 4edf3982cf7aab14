use chrono::{DateTime, Duration, Utc};

use crate::model::progress::{DEFAULT_EASE_FACTOR, MAX_EASE_FACTOR, MAX_LEVEL, MIN_EASE_FACTOR};
use crate::model::{AttemptFacts, AttemptLog, ProgressRecord, UserId, WordId};

/// Quality threshold separating a passing attempt from a relapse.
const PASSING_QUALITY: u8 = 3;

/// Interval granted to the second consecutive passing attempt.
const SECOND_PASS_INTERVAL_DAYS: i64 = 6;

//
// ─── APPLIED ATTEMPT ───────────────────────────────────────────────────────────
//

/// Outcome of applying one attempt: the rewritten progress record, the
/// audit entry to append, and the interval that produced the new schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedAttempt {
    pub progress: ProgressRecord,
    pub log: AttemptLog,
    pub interval_days: i64,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2-family scheduling engine.
///
/// `apply_attempt` is a pure function of its inputs: it performs no I/O,
/// never suspends, and holds no state, so one instance can serve any
/// number of concurrent callers. Persistence and key-level atomicity are
/// the repository's problem, not the scheduler's.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derive the 0..=5 quality score from an attempt.
    ///
    /// A correct answer scores its confidence directly. An incorrect
    /// answer still earns partial quality when the learner was sure of
    /// themselves: 2 at confidence >= 4, 1 at confidence 3, otherwise 0.
    #[must_use]
    pub fn quality(attempt: &AttemptFacts) -> u8 {
        let confidence = attempt.confidence.value();
        if attempt.is_correct {
            confidence
        } else if confidence >= 4 {
            2
        } else if confidence == 3 {
            1
        } else {
            0
        }
    }

    /// Apply one attempt to the prior state (or to no state, for a first
    /// attempt), producing the next progress record and its audit entry.
    ///
    /// Interval branches, in order: relapse (quality < 3) -> 1 day;
    /// first pass of a streak -> 1 day; second -> 6 days; after that
    /// `round(prior_factor * EF')`, where `prior_factor` is 2 when the
    /// prior record was already scheduled and 1 otherwise. That factor is
    /// a stand-in for the true previous interval, not canonical SM-2;
    /// changing it changes every long-streak schedule.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply_attempt(
        &self,
        user_id: &UserId,
        word_id: WordId,
        prior: Option<&ProgressRecord>,
        attempt: &AttemptFacts,
        now: DateTime<Utc>,
    ) -> AppliedAttempt {
        let quality = Self::quality(attempt);

        let prior_ease = prior.map_or(DEFAULT_EASE_FACTOR, |p| p.easiness_factor);
        let ease_factor = next_ease_factor(prior_ease, quality);

        let streak = if quality >= PASSING_QUALITY {
            prior.map_or(0, |p| p.consecutive_correct) + 1
        } else {
            0
        };

        let interval_days = if quality < PASSING_QUALITY {
            1
        } else if streak == 1 {
            1
        } else if streak == 2 {
            SECOND_PASS_INTERVAL_DAYS
        } else {
            let prior_factor = if prior.is_some_and(|p| p.next_review_date.is_some()) {
                2.0
            } else {
                1.0
            };
            (prior_factor * ease_factor).round() as i64
        };

        let level = (streak / 2 + 1).min(u32::from(MAX_LEVEL)) as u8;

        let progress = ProgressRecord {
            user_id: user_id.clone(),
            word_id,
            level,
            total_attempts: prior.map_or(0, |p| p.total_attempts) + 1,
            total_correct: prior.map_or(0, |p| p.total_correct)
                + u32::from(attempt.is_correct),
            easiness_factor: ease_factor,
            consecutive_correct: streak,
            last_attempt_date: Some(now),
            first_learned_date: prior.map_or(now, |p| p.first_learned_date),
            next_review_date: Some(now + Duration::days(interval_days)),
        };

        let log = AttemptLog {
            user_id: user_id.clone(),
            word_id,
            attempted_at: now,
            question_type: attempt.question_type.clone(),
            is_correct: attempt.is_correct,
            confidence: attempt.confidence,
            response_time_sec: attempt.response_time_sec,
            level_at_attempt: prior.map_or(1, |p| p.level),
        };

        AppliedAttempt {
            progress,
            log,
            interval_days,
        }
    }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), clamped to
/// [1.3, 2.5].
fn next_ease_factor(prior: f64, quality: u8) -> f64 {
    let shortfall = f64::from(5 - quality.min(5));
    let updated = prior + (0.1 - shortfall * (0.08 + shortfall * 0.02));
    updated.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
