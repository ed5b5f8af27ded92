use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{AnswerOption, KidId, PackageId, PackageOrder, Question, QuestionId, WrongAnswer};
use storage::repository::{
    AnswerRepository, AssignmentRepository, PackageRepository, QuestionRepository, Storage,
    WrongAnswerRepository,
};

use crate::error::BackendError;

/// Data operations the session runtime consumes.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Presentation order for each known package among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the lookup fails.
    async fn fetch_package_orders(
        &self,
        ids: &[PackageId],
    ) -> Result<Vec<PackageOrder>, BackendError>;

    /// Every question that belongs to one of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the lookup fails.
    async fn fetch_questions(&self, ids: &[PackageId]) -> Result<Vec<Question>, BackendError>;

    /// Options for the given questions, batched.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the lookup fails.
    async fn fetch_answer_options(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` when the record cannot be stored.
    async fn persist_wrong_answer(&self, record: &WrongAnswer) -> Result<(), BackendError>;

    /// Packages assigned to a kid, in assignment order.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` when the lookup fails.
    async fn fetch_assigned_packages(&self, kid_id: KidId)
    -> Result<Vec<PackageId>, BackendError>;
}

/// `QuizBackend` over the local repositories.
#[derive(Clone)]
pub struct StorageBackend {
    packages: Arc<dyn PackageRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    wrong_answers: Arc<dyn WrongAnswerRepository>,
}

impl StorageBackend {
    #[must_use]
    pub fn new(storage: &Storage) -> Self {
        Self {
            packages: Arc::clone(&storage.packages),
            questions: Arc::clone(&storage.questions),
            answers: Arc::clone(&storage.answers),
            assignments: Arc::clone(&storage.assignments),
            wrong_answers: Arc::clone(&storage.wrong_answers),
        }
    }
}

#[async_trait]
impl QuizBackend for StorageBackend {
    async fn fetch_package_orders(
        &self,
        ids: &[PackageId],
    ) -> Result<Vec<PackageOrder>, BackendError> {
        Ok(self.packages.package_orders(ids).await?)
    }

    async fn fetch_questions(&self, ids: &[PackageId]) -> Result<Vec<Question>, BackendError> {
        Ok(self.questions.questions_for_packages(ids).await?)
    }

    async fn fetch_answer_options(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, BackendError> {
        Ok(self.answers.options_for_questions(ids).await?)
    }

    async fn persist_wrong_answer(&self, record: &WrongAnswer) -> Result<(), BackendError> {
        self.wrong_answers.append_wrong_answer(record).await?;
        Ok(())
    }

    async fn fetch_assigned_packages(
        &self,
        kid_id: KidId,
    ) -> Result<Vec<PackageId>, BackendError> {
        Ok(self.assignments.assigned_packages(kid_id).await?)
    }
}
