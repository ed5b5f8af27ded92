use quiz_core::model::{AnswerId, AnswerOption, QuestionId, ValidatedAnswers};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_option_row, placeholders, ser};
use crate::repository::{AnswerRepository, StorageError};

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn options_for_questions(
        &self,
        question_ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, StorageError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r"
            SELECT id, question_id, content, is_correct
            FROM answer_options
            WHERE question_id IN ({})
            ORDER BY question_id ASC, position ASC, id ASC
            ",
            placeholders(1, question_ids.len())
        );
        let mut q = sqlx::query(&sql);
        for id in question_ids {
            q = q.bind(id_to_i64("question_id", id.value())?);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        rows.iter().map(map_option_row).collect()
    }

    async fn replace_options(
        &self,
        question_id: QuestionId,
        answers: &ValidatedAnswers,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let qid = id_to_i64("question_id", question_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM questions WHERE id = ?1")
            .bind(qid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query("DELETE FROM answer_options WHERE question_id = ?1")
            .bind(qid)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let mut options = Vec::with_capacity(answers.as_slice().len());
        for (position, draft) in answers.as_slice().iter().enumerate() {
            let res = sqlx::query(
                r"
                INSERT INTO answer_options (question_id, position, content, is_correct)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(qid)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(draft.content.clone())
            .bind(i64::from(draft.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            let id = u64::try_from(res.last_insert_rowid()).map_err(ser)?;
            options.push(AnswerOption::new(
                AnswerId::new(id),
                question_id,
                draft.content.clone(),
                draft.is_correct,
            ));
        }

        tx.commit().await.map_err(conn)?;
        Ok(options)
    }
}
