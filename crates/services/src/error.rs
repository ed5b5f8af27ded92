//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerId, PackageError, QuestionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors surfaced by a `QuizBackend`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("backend returned invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Misuse of the session machine by its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is accepting answers")]
    NotAccepting,
    #[error("question already answered")]
    AlreadyResolved,
    #[error("answer {0} does not belong to the current question")]
    UnknownAnswer(AnswerId),
}

/// Errors emitted by `PackageService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageServiceError {
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that abort a CSV import before any row is processed.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportError {
    #[error("the file is empty")]
    Empty,
    #[error("missing headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    #[error("unterminated quoted field on line {line}")]
    UnterminatedQuote { line: usize },
}

/// Why a single CSV row was not imported.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportRowError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("correctanswer must be 1 to 4, got {0:?}")]
    InvalidCorrectAnswer(String),
    #[error("{field} must be a whole number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error(transparent)]
    Question(#[from] QuestionServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
