use vocab_core::model::{Word, WordId, WordStatus};

use super::{
    SqliteRepository,
    mapping::{map_word_row, word_id_from_i64, word_id_to_i64},
};
use crate::repository::{NewWordRecord, StorageError, WordRepository};

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn insert_word(&self, word: NewWordRecord) -> Result<WordId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO words (
                    term, definition, part_of_speech, example_sentence, status, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(word.term)
        .bind(word.definition)
        .bind(word.part_of_speech)
        .bind(word.example_sentence)
        .bind(word.status.as_str())
        .bind(word.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        word_id_from_i64(res.last_insert_rowid())
    }

    async fn update_word(&self, word: &Word) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE words SET
                    term = ?2,
                    definition = ?3,
                    part_of_speech = ?4,
                    example_sentence = ?5,
                    status = ?6
                WHERE id = ?1
            ",
        )
        .bind(word_id_to_i64(word.id)?)
        .bind(word.term.as_str())
        .bind(word.definition.as_str())
        .bind(word.part_of_speech.as_deref())
        .bind(word.example_sentence.as_deref())
        .bind(word.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_word(&self, id: WordId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM words WHERE id = ?1")
            .bind(word_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, term, definition, part_of_speech, example_sentence, status, created_at
                FROM words
                WHERE id = ?1
            ",
        )
        .bind(word_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_word_row).transpose()
    }

    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, term, definition, part_of_speech, example_sentence, status, created_at
                FROM words
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_word_row).collect()
    }

    async fn list_active_words(&self) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, term, definition, part_of_speech, example_sentence, status, created_at
                FROM words
                WHERE status = ?1
                ORDER BY id ASC
            ",
        )
        .bind(WordStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_word_row).collect()
    }
}
