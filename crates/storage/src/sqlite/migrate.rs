use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the word catalog, per-(user, word) progress with its version
/// column, the append-only attempt log, and the supporting indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        log::debug!("applying sqlite schema version 1");
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    term TEXT NOT NULL,
                    definition TEXT NOT NULL,
                    part_of_speech TEXT,
                    example_sentence TEXT,
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS student_progress (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    word_id INTEGER NOT NULL,
                    level INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
                    total_attempts INTEGER NOT NULL CHECK (total_attempts >= 0),
                    total_correct INTEGER NOT NULL
                        CHECK (total_correct >= 0 AND total_correct <= total_attempts),
                    easiness_factor REAL NOT NULL
                        CHECK (easiness_factor >= 1.3 AND easiness_factor <= 2.5),
                    consecutive_correct INTEGER NOT NULL CHECK (consecutive_correct >= 0),
                    last_attempt_date TEXT,
                    first_learned_date TEXT NOT NULL,
                    next_review_date TEXT,
                    version INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (user_id, word_id),
                    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempt_logs (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    word_id INTEGER NOT NULL,
                    attempted_at TEXT NOT NULL,
                    question_type TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    confidence INTEGER NOT NULL CHECK (confidence BETWEEN 0 AND 5),
                    response_time_sec INTEGER NOT NULL CHECK (response_time_sec >= 0),
                    level_at_attempt INTEGER NOT NULL CHECK (level_at_attempt BETWEEN 1 AND 5),
                    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_words_status
                    ON words (status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_user_next_review
                    ON student_progress (user_id, next_review_date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempt_logs_user_word_attempted
                    ON attempt_logs (user_id, word_id, attempted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
