use sqlx::Row;
use vocab_core::model::{
    AttemptLog, Confidence, ProgressRecord, UserId, Word, WordId, WordStatus,
};

use crate::repository::{AttemptLogRecord, StorageError, VersionedProgress};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(i64_to_u64("word_id", v)?))
}

pub(crate) fn word_id_to_i64(id: WordId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("word_id overflow".into()))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_word_status(s: &str) -> Result<WordStatus, StorageError> {
    match s {
        "active" => Ok(WordStatus::Active),
        "inactive" => Ok(WordStatus::Inactive),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn map_word_row(row: &sqlx::sqlite::SqliteRow) -> Result<Word, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;

    Ok(Word {
        id: word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        term: row.try_get("term").map_err(ser)?,
        definition: row.try_get("definition").map_err(ser)?,
        part_of_speech: row.try_get("part_of_speech").map_err(ser)?,
        example_sentence: row.try_get("example_sentence").map_err(ser)?,
        status: parse_word_status(status_str.as_str())?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<VersionedProgress, StorageError> {
    let record = ProgressRecord::from_persisted(
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        word_id_from_i64(row.try_get::<i64, _>("word_id").map_err(ser)?)?,
        i64_to_u8("level", row.try_get::<i64, _>("level").map_err(ser)?)?,
        i64_to_u32(
            "total_attempts",
            row.try_get::<i64, _>("total_attempts").map_err(ser)?,
        )?,
        i64_to_u32(
            "total_correct",
            row.try_get::<i64, _>("total_correct").map_err(ser)?,
        )?,
        row.try_get("easiness_factor").map_err(ser)?,
        i64_to_u32(
            "consecutive_correct",
            row.try_get::<i64, _>("consecutive_correct").map_err(ser)?,
        )?,
        row.try_get("last_attempt_date").map_err(ser)?,
        row.try_get("first_learned_date").map_err(ser)?,
        row.try_get("next_review_date").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(VersionedProgress {
        version: row.try_get("version").map_err(ser)?,
        record,
    })
}

pub(crate) fn map_attempt_log_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptLogRecord, StorageError> {
    let confidence = Confidence::from_u8(i64_to_u8(
        "confidence",
        row.try_get::<i64, _>("confidence").map_err(ser)?,
    )?)
    .map_err(ser)?;

    Ok(AttemptLogRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        entry: AttemptLog {
            user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
            word_id: word_id_from_i64(row.try_get::<i64, _>("word_id").map_err(ser)?)?,
            attempted_at: row.try_get("attempted_at").map_err(ser)?,
            question_type: row.try_get("question_type").map_err(ser)?,
            is_correct: row.try_get("is_correct").map_err(ser)?,
            confidence,
            response_time_sec: i64_to_u32(
                "response_time_sec",
                row.try_get::<i64, _>("response_time_sec").map_err(ser)?,
            )?,
            level_at_attempt: i64_to_u8(
                "level_at_attempt",
                row.try_get::<i64, _>("level_at_attempt").map_err(ser)?,
            )?,
        },
    })
}
