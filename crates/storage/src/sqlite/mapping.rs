use quiz_core::model::{
    AttemptRecord, Category, CategoryId, Difficulty, Question, QuestionId, Quiz, QuizId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AttemptRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    let id = CategoryId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let folder: String = row.try_get("folder").map_err(ser)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let quiz_count = u32_from_i64("quiz_count", row.try_get("quiz_count").map_err(ser)?)?;

    Category::new(id, folder, difficulty, quiz_count).map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let id = QuizId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let category_id =
        CategoryId::new(i64_to_u64("category_id", row.try_get("category_id").map_err(ser)?)?);
    let title: String = row.try_get("title").map_err(ser)?;
    let question_count =
        u32_from_i64("question_count", row.try_get("question_count").map_err(ser)?)?;

    Quiz::new(id, category_id, title, question_count).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let quiz_id = QuizId::new(i64_to_u64("quiz_id", row.try_get("quiz_id").map_err(ser)?)?);
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;
    let correct_i64: i64 = row.try_get("correct_option").map_err(ser)?;
    let correct_option = usize::try_from(correct_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_option: {correct_i64}"))
    })?;
    let explanation: String = row.try_get("explanation").map_err(ser)?;

    Question::new(id, quiz_id, prompt, options, correct_option, explanation).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let quiz_id = QuizId::new(i64_to_u64("quiz_id", row.try_get("quiz_id").map_err(ser)?)?);
    let score = u32_from_i64("score", row.try_get("score").map_err(ser)?)?;
    let correct = u32_from_i64("correct_answers", row.try_get("correct_answers").map_err(ser)?)?;
    let incorrect = u32_from_i64(
        "incorrect_answers",
        row.try_get("incorrect_answers").map_err(ser)?,
    )?;
    let points = u32_from_i64("points", row.try_get("points").map_err(ser)?)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    let record = AttemptRecord::from_persisted(
        quiz_id,
        score,
        correct,
        incorrect,
        points,
        completed,
        completed_at,
    )
    .map_err(ser)?;
    Ok(AttemptRow::new(id, record))
}
