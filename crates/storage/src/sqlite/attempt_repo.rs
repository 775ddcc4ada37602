use quiz_core::model::{AttemptRecord, QuizId};

use super::mapping::{id_i64, map_attempt_row};
use super::{SqliteRepository, write_error};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    quiz_id, score, correct_answers, incorrect_answers,
                    points, completed, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("quiz_id", attempt.quiz_id().value())?)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.correct_answers()))
        .bind(i64::from(attempt.incorrect_answers()))
        .bind(i64::from(attempt.points()))
        .bind(attempt.completed())
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_attempts(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, quiz_id, score, correct_answers, incorrect_answers,
                    points, completed, completed_at
                FROM quiz_attempts
                WHERE quiz_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_attempt_row).collect()
    }
}
