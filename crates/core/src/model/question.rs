use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::answer::{AnswerDraft, AnswerSetError, ValidatedAnswers};
use crate::model::ids::{PackageId, QuestionId};

/// Inclusive bounds for a question's countdown, in seconds.
pub const TIME_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 5..=300;
/// Inclusive bounds for the points a question awards.
pub const POINTS_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;
pub const DEFAULT_POINTS: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question content cannot be empty")]
    EmptyContent,

    #[error("time limit must be between 5 and 300 seconds, got {0}")]
    InvalidTimeLimit(u32),

    #[error("points must be between 1 and 100, got {0}")]
    InvalidPoints(u32),

    #[error(transparent)]
    Answers(#[from] AnswerSetError),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single quiz question. Immutable for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    package_id: PackageId,
    content: String,
    time_limit_secs: u32,
    points: u32,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the content is blank or the time limit/points
    /// fall outside their bounds.
    pub fn new(
        id: QuestionId,
        package_id: PackageId,
        content: impl Into<String>,
        time_limit_secs: u32,
        points: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(QuestionError::EmptyContent);
        }
        if !TIME_LIMIT_RANGE.contains(&time_limit_secs) {
            return Err(QuestionError::InvalidTimeLimit(time_limit_secs));
        }
        if !POINTS_RANGE.contains(&points) {
            return Err(QuestionError::InvalidPoints(points));
        }

        Ok(Self {
            id,
            package_id,
            content: content.trim().to_owned(),
            time_limit_secs,
            points,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn package_id(&self) -> PackageId {
        self.package_id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as produced by the editor or CSV import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub package_id: PackageId,
    pub content: String,
    pub time_limit_secs: Option<u32>,
    pub points: Option<u32>,
    pub answers: Vec<AnswerDraft>,
}

/// Question content and answers that passed validation, awaiting an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub package_id: PackageId,
    pub content: String,
    pub time_limit_secs: u32,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub answers: ValidatedAnswers,
}

impl QuestionDraft {
    /// Validate the draft, filling in default time limit and points.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for invalid content, bounds, or answer sets.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let time_limit_secs = self.time_limit_secs.unwrap_or(DEFAULT_TIME_LIMIT_SECS);
        let points = self.points.unwrap_or(DEFAULT_POINTS);
        // Reuse the constructor's checks with a placeholder id.
        let question = Question::new(
            QuestionId::new(0),
            self.package_id,
            self.content,
            time_limit_secs,
            points,
            now,
        )?;
        let answers = ValidatedAnswers::new(self.answers)?;

        Ok(ValidatedQuestion {
            package_id: question.package_id,
            content: question.content,
            time_limit_secs,
            points,
            created_at: now,
            answers,
        })
    }
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(&self, id: QuestionId) -> Question {
        Question {
            id,
            package_id: self.package_id,
            content: self.content.clone(),
            time_limit_secs: self.time_limit_secs,
            points: self.points,
            created_at: self.created_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn answers() -> Vec<AnswerDraft> {
        vec![AnswerDraft::new("cat", true), AnswerDraft::new("dog", false)]
    }

    #[test]
    fn question_rejects_out_of_range_time_limit() {
        let err = Question::new(QuestionId::new(1), PackageId::new(1), "Q", 4, 10, fixed_now())
            .unwrap_err();
        assert_eq!(err, QuestionError::InvalidTimeLimit(4));

        let err = Question::new(QuestionId::new(1), PackageId::new(1), "Q", 301, 10, fixed_now())
            .unwrap_err();
        assert_eq!(err, QuestionError::InvalidTimeLimit(301));
    }

    #[test]
    fn question_rejects_out_of_range_points() {
        let err = Question::new(QuestionId::new(1), PackageId::new(1), "Q", 30, 0, fixed_now())
            .unwrap_err();
        assert_eq!(err, QuestionError::InvalidPoints(0));

        let err = Question::new(QuestionId::new(1), PackageId::new(1), "Q", 30, 101, fixed_now())
            .unwrap_err();
        assert_eq!(err, QuestionError::InvalidPoints(101));
    }

    #[test]
    fn draft_fills_defaults() {
        let validated = QuestionDraft {
            package_id: PackageId::new(2),
            content: "  Which animal meows?  ".into(),
            time_limit_secs: None,
            points: None,
            answers: answers(),
        }
        .validate(fixed_now())
        .unwrap();

        assert_eq!(validated.content, "Which animal meows?");
        assert_eq!(validated.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert_eq!(validated.points, DEFAULT_POINTS);

        let question = validated.assign_id(QuestionId::new(11));
        assert_eq!(question.id(), QuestionId::new(11));
        assert_eq!(question.package_id(), PackageId::new(2));
    }

    #[test]
    fn draft_surfaces_answer_errors() {
        let err = QuestionDraft {
            package_id: PackageId::new(2),
            content: "Q".into(),
            time_limit_secs: Some(30),
            points: Some(5),
            answers: vec![AnswerDraft::new("a", false), AnswerDraft::new("b", false)],
        }
        .validate(fixed_now())
        .unwrap_err();

        assert_eq!(err, QuestionError::Answers(AnswerSetError::NoCorrectAnswer));
        assert_eq!(err.to_string(), "invalid answers: no option is marked correct");
    }
}
