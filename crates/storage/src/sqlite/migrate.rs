use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the quiz schema.
///
/// Version 1 creates packages, questions, answer options, kid assignments and
/// the wrong-answer log, plus their indexes.
#[allow(clippy::too_many_lines)]
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

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS packages (
                    id INTEGER PRIMARY KEY,
                    guardian_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT,
                    presentation_order TEXT NOT NULL DEFAULT 'shuffle'
                        CHECK (presentation_order IN ('sequential', 'shuffle')),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    package_id INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    time_limit INTEGER NOT NULL CHECK (time_limit BETWEEN 5 AND 300),
                    points INTEGER NOT NULL CHECK (points BETWEEN 1 AND 100),
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_options (
                    id INTEGER PRIMARY KEY,
                    question_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    content TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS kid_packages (
                    kid_id INTEGER NOT NULL,
                    package_id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    PRIMARY KEY (kid_id, package_id),
                    FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS wrong_answers (
                    id INTEGER PRIMARY KEY,
                    kid_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    answer_id INTEGER,
                    question_content TEXT NOT NULL,
                    answer_content TEXT NOT NULL,
                    correct_content TEXT NOT NULL,
                    recorded_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_package_created
                    ON questions(package_id, created_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_answer_options_question
                    ON answer_options(question_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_wrong_answers_kid_recorded
                    ON wrong_answers(kid_id, recorded_at);
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
