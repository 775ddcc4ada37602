use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the consolidated schema migration (catalog tables, attempts, indexes).
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

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                folder TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                quiz_count INTEGER NOT NULL CHECK (quiz_count >= 0)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY,
                category_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                question_count INTEGER NOT NULL CHECK (question_count >= 0),
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // options are a JSON array of strings
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                quiz_id INTEGER NOT NULL,
                prompt TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_option INTEGER NOT NULL CHECK (correct_option >= 0),
                explanation TEXT NOT NULL,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY,
                quiz_id INTEGER NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
                incorrect_answers INTEGER NOT NULL CHECK (incorrect_answers >= 0),
                points INTEGER NOT NULL CHECK (points >= 0),
                completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                completed_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_quizzes_category
                ON quizzes (category_id, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_questions_quiz
                ON questions (quiz_id, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_quiz_attempts_quiz_completed
                ON quiz_attempts (quiz_id, completed_at);
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
    log::info!("applied sqlite schema version 1");

    Ok(())
}
