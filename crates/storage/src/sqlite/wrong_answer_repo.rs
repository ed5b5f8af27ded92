use quiz_core::model::{KidId, WrongAnswer};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_wrong_answer_row};
use crate::repository::{StorageError, WrongAnswerRepository};

#[async_trait::async_trait]
impl WrongAnswerRepository for SqliteRepository {
    async fn append_wrong_answer(&self, record: &WrongAnswer) -> Result<i64, StorageError> {
        let answer_id = record
            .answer_id
            .map(|id| id_to_i64("answer_id", id.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO wrong_answers (
                kid_id, question_id, answer_id, question_content,
                answer_content, correct_content, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("kid_id", record.kid_id.value())?)
        .bind(id_to_i64("question_id", record.question_id.value())?)
        .bind(answer_id)
        .bind(record.question_content.clone())
        .bind(record.answer_content.clone())
        .bind(record.correct_content.clone())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_wrong_answers(
        &self,
        kid_id: KidId,
        limit: u32,
    ) -> Result<Vec<WrongAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT kid_id, question_id, answer_id, question_content,
                   answer_content, correct_content, recorded_at
            FROM wrong_answers
            WHERE kid_id = ?1
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(id_to_i64("kid_id", kid_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_wrong_answer_row).collect()
    }
}
