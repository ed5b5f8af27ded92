use quiz_core::model::{AnswerId, AnswerOption, PackageId, Question, QuestionId, ValidatedQuestion};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_question_row, placeholders, ser};
use crate::repository::{QuestionRepository, StorageError};

fn rowid_to_u64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization("rowid sign overflow".into()))
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<(Question, Vec<AnswerOption>), StorageError> {
        let package_id = id_to_i64("package_id", question.package_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM packages WHERE id = ?1")
            .bind(package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO questions (package_id, content, time_limit, points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(package_id)
        .bind(question.content.clone())
        .bind(i64::from(question.time_limit_secs))
        .bind(i64::from(question.points))
        .bind(question.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let stored = question.assign_id(QuestionId::new(rowid_to_u64(res.last_insert_rowid())?));

        let mut options = Vec::with_capacity(question.answers.as_slice().len());
        for (position, draft) in question.answers.as_slice().iter().enumerate() {
            let res = sqlx::query(
                r"
                INSERT INTO answer_options (question_id, position, content, is_correct)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(id_to_i64("question_id", stored.id().value())?)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(draft.content.clone())
            .bind(i64::from(draft.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            options.push(AnswerOption::new(
                AnswerId::new(rowid_to_u64(res.last_insert_rowid())?),
                stored.id(),
                draft.content.clone(),
                draft.is_correct,
            ));
        }

        tx.commit().await.map_err(conn)?;
        Ok((stored, options))
    }

    async fn questions_for_packages(
        &self,
        package_ids: &[PackageId],
    ) -> Result<Vec<Question>, StorageError> {
        if package_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r"
            SELECT id, package_id, content, time_limit, points, created_at
            FROM questions
            WHERE package_id IN ({})
            ORDER BY package_id ASC, created_at ASC, id ASC
            ",
            placeholders(1, package_ids.len())
        );
        let mut q = sqlx::query(&sql);
        for id in package_ids {
            q = q.bind(id_to_i64("package_id", id.value())?);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id_to_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

impl SqliteRepository {
    /// Number of stored options for a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    pub async fn option_count(&self, question_id: QuestionId) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM answer_options WHERE question_id = ?1")
            .bind(id_to_i64("question_id", question_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u32::try_from(n).map_err(ser)
    }
}
