use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId};

pub const MIN_ANSWER_OPTIONS: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerSetError {
    #[error("invalid answers: at least {MIN_ANSWER_OPTIONS} options are required, got {0}")]
    TooFewOptions(usize),

    #[error("invalid answers: no option is marked correct")]
    NoCorrectAnswer,

    #[error("invalid answers: {0} options are marked correct")]
    MultipleCorrectAnswers(usize),

    #[error("invalid answers: the correct option has no content")]
    EmptyCorrectAnswer,
}

/// One selectable answer for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub content: String,
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(
        id: AnswerId,
        question_id: QuestionId,
        content: impl Into<String>,
        is_correct: bool,
    ) -> Self {
        Self {
            id,
            question_id,
            content: content.into(),
            is_correct,
        }
    }
}

/// Returns the option flagged correct, if any.
#[must_use]
pub fn correct_option(options: &[AnswerOption]) -> Option<&AnswerOption> {
    options.iter().find(|option| option.is_correct)
}

/// Unvalidated answer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDraft {
    pub content: String,
    pub is_correct: bool,
}

impl AnswerDraft {
    #[must_use]
    pub fn new(content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            content: content.into(),
            is_correct,
        }
    }
}

/// An answer set with at least two options and exactly one correct option.
///
/// Incorrect options may be empty strings; imports keep blank columns as
/// options instead of dropping them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAnswers(Vec<AnswerDraft>);

impl ValidatedAnswers {
    /// Validate an answer set.
    ///
    /// # Errors
    ///
    /// Returns `AnswerSetError` when fewer than two options are supplied or the
    /// number of correct options is not exactly one.
    pub fn new(answers: Vec<AnswerDraft>) -> Result<Self, AnswerSetError> {
        if answers.len() < MIN_ANSWER_OPTIONS {
            return Err(AnswerSetError::TooFewOptions(answers.len()));
        }

        let answers: Vec<AnswerDraft> = answers
            .into_iter()
            .map(|a| AnswerDraft::new(a.content.trim(), a.is_correct))
            .collect();

        let correct: Vec<&AnswerDraft> = answers.iter().filter(|a| a.is_correct).collect();
        match correct.as_slice() {
            [] => return Err(AnswerSetError::NoCorrectAnswer),
            [only] if only.content.is_empty() => return Err(AnswerSetError::EmptyCorrectAnswer),
            [_] => {}
            many => return Err(AnswerSetError::MultipleCorrectAnswers(many.len())),
        }

        Ok(Self(answers))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[AnswerDraft] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<AnswerDraft> {
        self.0
    }
}
