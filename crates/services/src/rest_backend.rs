use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerId, AnswerOption, KidId, PackageId, PackageOrder, PresentationOrder, Question,
    QuestionId, WrongAnswer,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::QuizBackend;
use crate::error::BackendError;

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestConfig {
    /// Reads `QUIZ_API_URL` and `QUIZ_API_KEY`; `None` unless both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_URL").ok()?;
        let api_key = env::var("QUIZ_API_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }
}

/// `QuizBackend` speaking PostgREST-style HTTP/JSON.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    config: RestConfig,
}

impl RestBackend {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{table}", self.config.base_url.trim_end_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn get_rows<T>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, BackendError>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!(table, "backend GET");
        let response = self
            .authed(self.client.get(self.url(table)))
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

/// PostgREST `in.(..)` filter value.
fn in_list(ids: impl IntoIterator<Item = u64>) -> String {
    let joined = ids
        .into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

#[derive(Debug, Deserialize)]
struct PackageOrderRow {
    id: u64,
    presentation_order: String,
}

impl PackageOrderRow {
    fn into_order(self) -> Result<PackageOrder, BackendError> {
        let order = self
            .presentation_order
            .parse::<PresentationOrder>()
            .map_err(|e| BackendError::InvalidData(e.to_string()))?;
        Ok(PackageOrder {
            package_id: PackageId::new(self.id),
            order,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    id: u64,
    package_id: u64,
    content: String,
    time_limit: u32,
    points: u32,
    created_at: DateTime<Utc>,
}

impl QuestionRow {
    fn into_question(self) -> Result<Question, BackendError> {
        Question::new(
            QuestionId::new(self.id),
            PackageId::new(self.package_id),
            self.content,
            self.time_limit,
            self.points,
            self.created_at,
        )
        .map_err(|e| BackendError::InvalidData(e.to_string()))
    }
}

/// Keeps the rows that convert; a bad row is logged and skipped so the rest
/// of the batch survives.
fn keep_valid<R, T>(
    rows: Vec<R>,
    table: &'static str,
    row_id: impl Fn(&R) -> u64,
    convert: impl Fn(R) -> Result<T, BackendError>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row_id(&row);
            convert(row)
                .map_err(|e| warn!(table, id, error = %e, "skipping invalid row"))
                .ok()
        })
        .collect()
}

fn orders_from_rows(rows: Vec<PackageOrderRow>) -> Vec<PackageOrder> {
    keep_valid(rows, "packages", |row| row.id, PackageOrderRow::into_order)
}

fn questions_from_rows(rows: Vec<QuestionRow>) -> Vec<Question> {
    keep_valid(rows, "questions", |row| row.id, QuestionRow::into_question)
}

#[derive(Debug, Deserialize)]
struct AnswerRow {
    id: u64,
    question_id: u64,
    #[serde(default)]
    content: String,
    is_correct: bool,
}

impl From<AnswerRow> for AnswerOption {
    fn from(row: AnswerRow) -> Self {
        AnswerOption::new(
            AnswerId::new(row.id),
            QuestionId::new(row.question_id),
            row.content,
            row.is_correct,
        )
    }
}

#[derive(Debug, Deserialize)]
struct AssignmentRow {
    package_id: u64,
}

#[derive(Debug, Serialize)]
struct WrongAnswerBody<'a> {
    kid_id: u64,
    question_id: u64,
    answer_id: Option<u64>,
    question_content: &'a str,
    answer_content: &'a str,
    correct_content: &'a str,
    recorded_at: DateTime<Utc>,
}

impl<'a> From<&'a WrongAnswer> for WrongAnswerBody<'a> {
    fn from(record: &'a WrongAnswer) -> Self {
        Self {
            kid_id: record.kid_id.value(),
            question_id: record.question_id.value(),
            answer_id: record.answer_id.map(|id| id.value()),
            question_content: &record.question_content,
            answer_content: &record.answer_content,
            correct_content: &record.correct_content,
            recorded_at: record.recorded_at,
        }
    }
}

#[async_trait]
impl QuizBackend for RestBackend {
    async fn fetch_package_orders(
        &self,
        ids: &[PackageId],
    ) -> Result<Vec<PackageOrder>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<PackageOrderRow> = self
            .get_rows(
                "packages",
                &[
                    ("select", "id,presentation_order".into()),
                    ("id", in_list(ids.iter().map(PackageId::value))),
                ],
            )
            .await?;
        Ok(orders_from_rows(rows))
    }

    async fn fetch_questions(&self, ids: &[PackageId]) -> Result<Vec<Question>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<QuestionRow> = self
            .get_rows(
                "questions",
                &[
                    (
                        "select",
                        "id,package_id,content,time_limit,points,created_at".into(),
                    ),
                    ("package_id", in_list(ids.iter().map(PackageId::value))),
                    ("order", "created_at.asc,id.asc".into()),
                ],
            )
            .await?;
        Ok(questions_from_rows(rows))
    }

    async fn fetch_answer_options(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<AnswerRow> = self
            .get_rows(
                "answers",
                &[
                    ("select", "id,question_id,content,is_correct".into()),
                    ("question_id", in_list(ids.iter().map(QuestionId::value))),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(AnswerOption::from).collect())
    }

    async fn persist_wrong_answer(&self, record: &WrongAnswer) -> Result<(), BackendError> {
        let response = self
            .authed(self.client.post(self.url("wrong_answers")))
            .header("Prefer", "return=minimal")
            .json(&WrongAnswerBody::from(record))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::HttpStatus(response.status()));
        }
        Ok(())
    }

    async fn fetch_assigned_packages(
        &self,
        kid_id: KidId,
    ) -> Result<Vec<PackageId>, BackendError> {
        let rows: Vec<AssignmentRow> = self
            .get_rows(
                "kid_packages",
                &[
                    ("select", "package_id".into()),
                    ("kid_id", format!("eq.{}", kid_id.value())),
                    ("order", "position.asc".into()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PackageId::new(row.package_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    #[test]
    fn in_list_formats_postgrest_filter() {
        assert_eq!(in_list([3, 1, 2]), "in.(3,1,2)");
        assert_eq!(in_list(std::iter::empty()), "in.()");
    }

    #[test]
    fn question_rows_are_validated() {
        let rows: Vec<QuestionRow> = serde_json::from_str(
            r#"[
                {"id": 1, "package_id": 2, "content": "Q", "time_limit": 30, "points": 10,
                 "created_at": "2023-11-14T22:13:20Z"},
                {"id": 2, "package_id": 2, "content": "Q", "time_limit": 1, "points": 10,
                 "created_at": "2023-11-14T22:13:20Z"}
            ]"#,
        )
        .unwrap();
        let mut rows = rows.into_iter();

        let ok = rows.next().unwrap().into_question().unwrap();
        assert_eq!(ok.created_at(), fixed_now());
        assert!(matches!(
            rows.next().unwrap().into_question(),
            Err(BackendError::InvalidData(_))
        ));
    }

    #[test]
    fn package_order_rows_parse_case_insensitively() {
        let row: PackageOrderRow =
            serde_json::from_str(r#"{"id": 5, "presentation_order": "Sequential"}"#).unwrap();
        assert_eq!(row.into_order().unwrap().order, PresentationOrder::Sequential);

        let bad: PackageOrderRow =
            serde_json::from_str(r#"{"id": 5, "presentation_order": "random"}"#).unwrap();
        assert!(bad.into_order().is_err());
    }

    #[test]
    fn one_unknown_order_keeps_the_other_packages() {
        let rows: Vec<PackageOrderRow> = serde_json::from_str(
            r#"[
                {"id": 1, "presentation_order": "sequential"},
                {"id": 2, "presentation_order": "alphabetical"},
                {"id": 3, "presentation_order": "shuffle"}
            ]"#,
        )
        .unwrap();

        let orders = orders_from_rows(rows);
        assert_eq!(
            orders,
            vec![
                PackageOrder {
                    package_id: PackageId::new(1),
                    order: PresentationOrder::Sequential,
                },
                PackageOrder {
                    package_id: PackageId::new(3),
                    order: PresentationOrder::Shuffle,
                },
            ]
        );
    }

    #[test]
    fn out_of_range_question_is_dropped_alone() {
        let rows: Vec<QuestionRow> = serde_json::from_str(
            r#"[
                {"id": 1, "package_id": 2, "content": "A", "time_limit": 30, "points": 10,
                 "created_at": "2023-11-14T22:13:20Z"},
                {"id": 2, "package_id": 2, "content": "B", "time_limit": 30, "points": 500,
                 "created_at": "2023-11-14T22:13:20Z"},
                {"id": 3, "package_id": 2, "content": "C", "time_limit": 301, "points": 10,
                 "created_at": "2023-11-14T22:13:20Z"},
                {"id": 4, "package_id": 2, "content": "D", "time_limit": 5, "points": 100,
                 "created_at": "2023-11-14T22:13:20Z"}
            ]"#,
        )
        .unwrap();

        let ids: Vec<QuestionId> = questions_from_rows(rows).iter().map(Question::id).collect();
        assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(4)]);
    }

    #[test]
    fn answer_rows_default_missing_content() {
        let row: AnswerRow =
            serde_json::from_str(r#"{"id": 1, "question_id": 4, "is_correct": false}"#).unwrap();
        let option = AnswerOption::from(row);
        assert_eq!(option.content, "");
        assert_eq!(option.question_id, QuestionId::new(4));
    }

    #[test]
    fn wrong_answer_body_serializes_ids_flat() {
        let record = WrongAnswer {
            kid_id: KidId::new(1),
            question_id: QuestionId::new(2),
            answer_id: None,
            question_content: "Q".into(),
            answer_content: String::new(),
            correct_content: "A".into(),
            recorded_at: fixed_now(),
        };
        let json = serde_json::to_value(WrongAnswerBody::from(&record)).unwrap();
        assert_eq!(json["kid_id"], 1);
        assert_eq!(json["answer_id"], serde_json::Value::Null);
        assert_eq!(json["correct_content"], "A");
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = RestConfig {
            base_url: "http://localhost:3000/".into(),
            api_key: "k".into(),
        };
        let backend = RestBackend::new(config);
        assert_eq!(backend.url("packages"), "http://localhost:3000/packages");
    }
}
