use std::collections::HashMap;
use std::sync::Arc;

use quiz_core::model::{
    AnswerDraft, AnswerOption, KidId, PackageId, Question, QuestionDraft, QuestionError,
    QuestionId, ValidatedAnswers, WrongAnswer,
};
use storage::repository::{AnswerRepository, QuestionRepository, WrongAnswerRepository};
use tracing::info;

use crate::Clock;
use crate::error::QuestionServiceError;

/// A question with its options in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

/// Question authoring and wrong-answer review.
#[derive(Clone)]
pub struct QuestionService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    wrong_answers: Arc<dyn WrongAnswerRepository>,
}

impl QuestionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
        wrong_answers: Arc<dyn WrongAnswerRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            answers,
            wrong_answers,
        }
    }

    /// Validate and store a question with its options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Question` for invalid content, bounds, or
    /// answer sets.
    /// Returns `QuestionServiceError::Storage` if the package is missing or
    /// persistence fails.
    pub async fn create_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<QuestionWithOptions, QuestionServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let (question, options) = self.questions.insert_question(&validated).await?;
        info!(
            question_id = %question.id(),
            package_id = %question.package_id(),
            options = options.len(),
            "question created"
        );
        Ok(QuestionWithOptions { question, options })
    }

    /// Questions of a package in creation order, each with its options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_for_package(
        &self,
        package_id: PackageId,
    ) -> Result<Vec<QuestionWithOptions>, QuestionServiceError> {
        let mut questions = self.questions.questions_for_packages(&[package_id]).await?;
        questions.sort_by_key(|q| (q.created_at(), q.id()));

        let ids: Vec<QuestionId> = questions.iter().map(Question::id).collect();
        let mut by_question: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
        for option in self.answers.options_for_questions(&ids).await? {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id()).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if the question is missing or
    /// repository access fails.
    pub async fn delete_question(&self, question_id: QuestionId) -> Result<(), QuestionServiceError> {
        self.questions.delete_question(question_id).await?;
        info!(question_id = %question_id, "question deleted");
        Ok(())
    }

    /// Swap a question's whole answer set.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Question` if the new set is invalid.
    /// Returns `QuestionServiceError::Storage` if the question is missing or
    /// persistence fails.
    pub async fn replace_options(
        &self,
        question_id: QuestionId,
        answers: Vec<AnswerDraft>,
    ) -> Result<Vec<AnswerOption>, QuestionServiceError> {
        let answers = ValidatedAnswers::new(answers).map_err(QuestionError::from)?;
        Ok(self.answers.replace_options(question_id, &answers).await?)
    }

    /// Most recent wrong answers for a kid, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn wrong_answers(
        &self,
        kid_id: KidId,
        limit: u32,
    ) -> Result<Vec<WrongAnswer>, QuestionServiceError> {
        Ok(self.wrong_answers.list_wrong_answers(kid_id, limit).await?)
    }
}
