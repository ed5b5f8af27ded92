use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, KidId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("answered count ({answered}) exceeds total questions ({total})")]
    TooManyAnswers { answered: usize, total: usize },

    #[error("correct count ({correct}) exceeds answered count ({answered})")]
    CountMismatch { correct: u32, answered: usize },
}

/// One answer given during a session. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KidAnswer {
    pub question_id: QuestionId,
    /// `None` when the countdown ran out before an answer was chosen.
    pub answer_id: Option<AnswerId>,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub timed_out: bool,
    pub answered_at: DateTime<Utc>,
}

/// A wrong answer persisted for later review by the guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub kid_id: KidId,
    pub question_id: QuestionId,
    pub answer_id: Option<AnswerId>,
    pub question_content: String,
    pub answer_content: String,
    pub correct_content: String,
    pub recorded_at: DateTime<Utc>,
}

/// Final tallies for a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    total_questions: usize,
    answered: usize,
    correct: u32,
    total_points: u32,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the counts are inconsistent.
    pub fn new(
        total_questions: usize,
        answered: usize,
        correct: u32,
        total_points: u32,
    ) -> Result<Self, SessionSummaryError> {
        if answered > total_questions {
            return Err(SessionSummaryError::TooManyAnswers {
                answered,
                total: total_questions,
            });
        }
        if usize::try_from(correct).unwrap_or(usize::MAX) > answered {
            return Err(SessionSummaryError::CountMismatch { correct, answered });
        }
        Ok(Self {
            total_questions,
            answered,
            correct,
            total_points,
        })
    }

    /// Build a summary from a session's answer history.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::TooManyAnswers` if the history is longer
    /// than the question sequence.
    pub fn from_answers(
        total_questions: usize,
        answers: &[KidAnswer],
    ) -> Result<Self, SessionSummaryError> {
        let mut correct = 0_u32;
        let mut total_points = 0_u32;
        for answer in answers {
            if answer.is_correct {
                correct = correct.saturating_add(1);
            }
            total_points = total_points.saturating_add(answer.points_awarded);
        }
        Self::new(total_questions, answers.len(), correct, total_points)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }
}
