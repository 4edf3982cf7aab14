use vocab_core::model::{AttemptLog, ProgressRecord, UserId, WordId};

use super::{
    SqliteRepository,
    mapping::{map_attempt_log_row, map_progress_row, word_id_to_i64},
};
use crate::repository::{
    AttemptLogRecord, AttemptPersistence, ProgressRepository, StorageError, VersionedProgress,
};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    user_id, word_id, level, total_attempts, total_correct,
                    easiness_factor, consecutive_correct, last_attempt_date,
                    first_learned_date, next_review_date, version
                FROM student_progress
                WHERE user_id = ?1 AND word_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(word_id_to_i64(word_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    user_id, word_id, level, total_attempts, total_correct,
                    easiness_factor, consecutive_correct, last_attempt_date,
                    first_learned_date, next_review_date, version
                FROM student_progress
                WHERE user_id = ?1
                ORDER BY word_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter()
            .map(|row| map_progress_row(row).map(|vp| vp.record))
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    user_id, word_id, level, total_attempts, total_correct,
                    easiness_factor, consecutive_correct, last_attempt_date,
                    first_learned_date, next_review_date, version
                FROM student_progress
                ORDER BY user_id ASC, word_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter()
            .map(|row| map_progress_row(row).map(|vp| vp.record))
            .collect()
    }

    async fn logs_for_word(
        &self,
        user_id: &UserId,
        word_id: WordId,
    ) -> Result<Vec<AttemptLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, word_id, attempted_at, question_type,
                    is_correct, confidence, response_time_sec, level_at_attempt
                FROM attempt_logs
                WHERE user_id = ?1 AND word_id = ?2
                ORDER BY attempted_at ASC, id ASC
            ",
        )
        .bind(user_id.as_str())
        .bind(word_id_to_i64(word_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_attempt_log_row).collect()
    }
}

#[async_trait::async_trait]
impl AttemptPersistence for SqliteRepository {
    async fn apply_attempt(
        &self,
        expected_version: Option<i64>,
        progress: &ProgressRecord,
        log: &AttemptLog,
    ) -> Result<i64, StorageError> {
        if log.user_id != progress.user_id || log.word_id != progress.word_id {
            return Err(StorageError::Conflict);
        }

        let word_id = word_id_to_i64(progress.word_id)?;
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        match expected_version {
            None => {
                let inserted = sqlx::query(
                    r"
                        INSERT INTO student_progress (
                            user_id, word_id, level, total_attempts, total_correct,
                            easiness_factor, consecutive_correct, last_attempt_date,
                            first_learned_date, next_review_date, version
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)
                    ",
                )
                .bind(progress.user_id.as_str())
                .bind(word_id)
                .bind(i64::from(progress.level))
                .bind(i64::from(progress.total_attempts))
                .bind(i64::from(progress.total_correct))
                .bind(progress.easiness_factor)
                .bind(i64::from(progress.consecutive_correct))
                .bind(progress.last_attempt_date)
                .bind(progress.first_learned_date)
                .bind(progress.next_review_date)
                .execute(&mut *tx)
                .await;

                if let Err(e) = inserted {
                    if e.as_database_error()
                        .is_some_and(|db| db.is_unique_violation())
                    {
                        return Err(StorageError::Conflict);
                    }
                    return Err(conn_err(e));
                }
            }
            Some(expected) => {
                let res = sqlx::query(
                    r"
                        UPDATE student_progress SET
                            level = ?4,
                            total_attempts = ?5,
                            total_correct = ?6,
                            easiness_factor = ?7,
                            consecutive_correct = ?8,
                            last_attempt_date = ?9,
                            next_review_date = ?10,
                            version = version + 1
                        WHERE user_id = ?1 AND word_id = ?2 AND version = ?3
                    ",
                )
                .bind(progress.user_id.as_str())
                .bind(word_id)
                .bind(expected)
                .bind(i64::from(progress.level))
                .bind(i64::from(progress.total_attempts))
                .bind(i64::from(progress.total_correct))
                .bind(progress.easiness_factor)
                .bind(i64::from(progress.consecutive_correct))
                .bind(progress.last_attempt_date)
                .bind(progress.next_review_date)
                .execute(&mut *tx)
                .await
                .map_err(conn_err)?;

                // Another attempt bumped the version between our read and
                // this write; the dropped transaction rolls back.
                if res.rows_affected() == 0 {
                    return Err(StorageError::Conflict);
                }
            }
        }

        let res = sqlx::query(
            r"
                INSERT INTO attempt_logs (
                    user_id, word_id, attempted_at, question_type,
                    is_correct, confidence, response_time_sec, level_at_attempt
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(log.user_id.as_str())
        .bind(word_id)
        .bind(log.attempted_at)
        .bind(log.question_type.as_str())
        .bind(log.is_correct)
        .bind(i64::from(log.confidence.value()))
        .bind(i64::from(log.response_time_sec))
        .bind(i64::from(log.level_at_attempt))
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        tx.commit().await.map_err(conn_err)?;

        Ok(res.last_insert_rowid())
    }
}
