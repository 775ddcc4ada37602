use quiz_core::model::{Category, CategoryId, Question, Quiz, QuizId};

use super::mapping::{id_i64, map_category_row, map_question_row, map_quiz_row, ser};
use super::{SqliteRepository, write_error};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO categories (id, folder, difficulty, quiz_count)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                folder = excluded.folder,
                difficulty = excluded.difficulty,
                quiz_count = excluded.quiz_count
            ",
        )
        .bind(id_i64("category_id", category.id().value())?)
        .bind(category.folder())
        .bind(category.difficulty().as_str())
        .bind(i64::from(category.quiz_count()))
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quizzes (id, category_id, title, question_count)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                title = excluded.title,
                question_count = excluded.question_count
            ",
        )
        .bind(id_i64("quiz_id", quiz.id().value())?)
        .bind(id_i64("category_id", quiz.category_id().value())?)
        .bind(quiz.title())
        .bind(i64::from(quiz.question_count()))
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let options = serde_json::to_string(question.options()).map_err(ser)?;
        let correct = i64::try_from(question.correct_option())
            .map_err(|_| StorageError::Serialization("correct_option overflow".into()))?;

        sqlx::query(
            r"
            INSERT INTO questions (id, quiz_id, prompt, options, correct_option, explanation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                quiz_id = excluded.quiz_id,
                prompt = excluded.prompt,
                options = excluded.options,
                correct_option = excluded.correct_option,
                explanation = excluded.explanation
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("quiz_id", question.quiz_id().value())?)
        .bind(question.prompt())
        .bind(options)
        .bind(correct)
        .bind(question.explanation())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, folder, difficulty, quiz_count
            FROM categories
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_category_row).collect()
    }

    async fn list_quizzes(&self, category_id: CategoryId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, category_id, title, question_count
            FROM quizzes
            WHERE category_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("category_id", category_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, quiz_id, prompt, options, correct_option, explanation
            FROM questions
            WHERE quiz_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
