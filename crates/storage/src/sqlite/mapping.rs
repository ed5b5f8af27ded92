use quiz_core::model::{
    AnswerId, AnswerOption, GuardianId, KidId, Package, PackageId, PresentationOrder, Question,
    QuestionId, WrongAnswer,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// `?start, ?start+1, ...` for `count` positional parameters.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn parse_order(s: &str) -> Result<PresentationOrder, StorageError> {
    s.parse::<PresentationOrder>().map_err(ser)
}

pub(crate) fn map_package_row(row: &SqliteRow) -> Result<Package, StorageError> {
    let order: String = row.try_get("presentation_order").map_err(ser)?;
    Package::new(
        PackageId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        GuardianId::new(i64_to_u64(
            "guardian_id",
            row.try_get("guardian_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("description")
            .map_err(ser)?,
        parse_order(&order)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Question::new(
        QuestionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        PackageId::new(i64_to_u64(
            "package_id",
            row.try_get("package_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("content").map_err(ser)?,
        u32_from_i64("time_limit", row.try_get("time_limit").map_err(ser)?)?,
        u32_from_i64("points", row.try_get("points").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_option_row(row: &SqliteRow) -> Result<AnswerOption, StorageError> {
    Ok(AnswerOption::new(
        AnswerId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        QuestionId::new(i64_to_u64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("content").map_err(ser)?,
        row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    ))
}

pub(crate) fn map_wrong_answer_row(row: &SqliteRow) -> Result<WrongAnswer, StorageError> {
    Ok(WrongAnswer {
        kid_id: KidId::new(i64_to_u64("kid_id", row.try_get("kid_id").map_err(ser)?)?),
        question_id: QuestionId::new(i64_to_u64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        answer_id: row
            .try_get::<Option<i64>, _>("answer_id")
            .map_err(ser)?
            .map(|v| i64_to_u64("answer_id", v).map(AnswerId::new))
            .transpose()?,
        question_content: row.try_get("question_content").map_err(ser)?,
        answer_content: row.try_get("answer_content").map_err(ser)?,
        correct_content: row.try_get("correct_content").map_err(ser)?,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_from_start() {
        assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(1, 0), "");
    }

    #[test]
    fn id_to_i64_rejects_overflow() {
        assert!(id_to_i64("id", u64::MAX).is_err());
        assert_eq!(id_to_i64("id", 5).unwrap(), 5);
    }

    #[test]
    fn parse_order_maps_unknown_to_serialization_error() {
        assert!(matches!(
            parse_order("alphabetical"),
            Err(StorageError::Serialization(_))
        ));
    }
}
