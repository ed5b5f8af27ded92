use thiserror::Error;

use crate::model::{AnswerSetError, PackageError, QuestionError, SessionSummaryError};
use crate::settings::SettingsError;

/// Umbrella error for callers that do not care which domain check failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answers(#[from] AnswerSetError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
