use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerId, AnswerOption, GuardianId, KidId, Package, PackageId, PackageOrder,
    PresentationOrder, Question, QuestionId, ValidatedAnswers, ValidatedQuestion, WrongAnswer,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a package whose ID is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPackageRecord {
    pub guardian_id: GuardianId,
    pub name: String,
    pub description: Option<String>,
    pub order: PresentationOrder,
    pub created_at: DateTime<Utc>,
}

impl NewPackageRecord {
    #[must_use]
    pub fn from_package(package: &Package) -> Self {
        Self {
            guardian_id: package.guardian_id(),
            name: package.name().to_owned(),
            description: package.description().map(ToOwned::to_owned),
            order: package.order(),
            created_at: package.created_at(),
        }
    }
}

#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Insert a package and return its store-assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the package cannot be stored.
    async fn insert_new_package(&self, package: NewPackageRecord)
    -> Result<PackageId, StorageError>;

    /// Persist or update a package.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the package cannot be stored.
    async fn upsert_package(&self, package: &Package) -> Result<(), StorageError>;

    /// Fetch a package by ID; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, StorageError>;

    /// List a guardian's packages ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_packages(&self, guardian_id: GuardianId) -> Result<Vec<Package>, StorageError>;

    /// Delete a package together with its questions, options and assignments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the package does not exist.
    async fn delete_package(&self, id: PackageId) -> Result<(), StorageError>;

    /// Presentation order for each existing package among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn package_orders(&self, ids: &[PackageId]) -> Result<Vec<PackageOrder>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a validated question and its options atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the package does not exist.
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<(Question, Vec<AnswerOption>), StorageError>;

    /// All questions belonging to any of the given packages.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn questions_for_packages(
        &self,
        package_ids: &[PackageId],
    ) -> Result<Vec<Question>, StorageError>;

    /// Delete a question and its options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Options for the given questions, in stored order per question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn options_for_questions(
        &self,
        question_ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, StorageError>;

    /// Replace every option of a question with a new validated set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn replace_options(
        &self,
        question_id: QuestionId,
        answers: &ValidatedAnswers,
    ) -> Result<Vec<AnswerOption>, StorageError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Assign a package to a kid. Re-assigning keeps the original position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the package does not exist.
    async fn assign_package(&self, kid_id: KidId, package_id: PackageId)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn unassign_package(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), StorageError>;

    /// Packages assigned to a kid, in assignment order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn assigned_packages(&self, kid_id: KidId) -> Result<Vec<PackageId>, StorageError>;
}

#[async_trait]
pub trait WrongAnswerRepository: Send + Sync {
    /// Append a wrong-answer record and return its row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_wrong_answer(&self, record: &WrongAnswer) -> Result<i64, StorageError>;

    /// Most recent wrong answers for a kid, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_wrong_answers(
        &self,
        kid_id: KidId,
        limit: u32,
    ) -> Result<Vec<WrongAnswer>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    next_package_id: u64,
    next_question_id: u64,
    next_answer_id: u64,
    packages: BTreeMap<PackageId, Package>,
    questions: BTreeMap<QuestionId, Question>,
    options: BTreeMap<AnswerId, AnswerOption>,
    assignments: BTreeMap<KidId, Vec<PackageId>>,
    wrong_answers: Vec<WrongAnswer>,
}

impl InMemoryState {
    fn remove_question(&mut self, id: QuestionId) {
        self.questions.remove(&id);
        self.options.retain(|_, option| option.question_id != id);
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl PackageRepository for InMemoryRepository {
    async fn insert_new_package(
        &self,
        package: NewPackageRecord,
    ) -> Result<PackageId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_package_id += 1;
        let id = PackageId::new(guard.next_package_id);
        let package = Package::new(
            id,
            package.guardian_id,
            package.name,
            package.description,
            package.order,
            package.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.packages.insert(id, package);
        Ok(id)
    }

    async fn upsert_package(&self, package: &Package) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.next_package_id = guard.next_package_id.max(package.id().value());
        guard.packages.insert(package.id(), package.clone());
        Ok(())
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, StorageError> {
        Ok(self.lock()?.packages.get(&id).cloned())
    }

    async fn list_packages(&self, guardian_id: GuardianId) -> Result<Vec<Package>, StorageError> {
        Ok(self
            .lock()?
            .packages
            .values()
            .filter(|p| p.guardian_id() == guardian_id)
            .cloned()
            .collect())
    }

    async fn delete_package(&self, id: PackageId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.packages.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        let doomed: Vec<QuestionId> = guard
            .questions
            .values()
            .filter(|q| q.package_id() == id)
            .map(Question::id)
            .collect();
        for question_id in doomed {
            guard.remove_question(question_id);
        }
        for assigned in guard.assignments.values_mut() {
            assigned.retain(|p| *p != id);
        }
        Ok(())
    }

    async fn package_orders(&self, ids: &[PackageId]) -> Result<Vec<PackageOrder>, StorageError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.packages.get(id).map(Package::package_order))
            .collect())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<(Question, Vec<AnswerOption>), StorageError> {
        let mut guard = self.lock()?;
        if !guard.packages.contains_key(&question.package_id) {
            return Err(StorageError::NotFound);
        }
        guard.next_question_id += 1;
        let stored = question.assign_id(QuestionId::new(guard.next_question_id));

        let mut options = Vec::with_capacity(question.answers.as_slice().len());
        for draft in question.answers.as_slice() {
            guard.next_answer_id += 1;
            let option = AnswerOption::new(
                AnswerId::new(guard.next_answer_id),
                stored.id(),
                draft.content.clone(),
                draft.is_correct,
            );
            guard.options.insert(option.id, option.clone());
            options.push(option);
        }
        guard.questions.insert(stored.id(), stored.clone());
        Ok((stored, options))
    }

    async fn questions_for_packages(
        &self,
        package_ids: &[PackageId],
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| package_ids.contains(&q.package_id()))
            .cloned()
            .collect())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_question(id);
        Ok(())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn options_for_questions(
        &self,
        question_ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .options
            .values()
            .filter(|o| question_ids.contains(&o.question_id))
            .cloned()
            .collect())
    }

    async fn replace_options(
        &self,
        question_id: QuestionId,
        answers: &ValidatedAnswers,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&question_id) {
            return Err(StorageError::NotFound);
        }
        guard.options.retain(|_, o| o.question_id != question_id);

        let mut options = Vec::with_capacity(answers.as_slice().len());
        for draft in answers.as_slice() {
            guard.next_answer_id += 1;
            let option = AnswerOption::new(
                AnswerId::new(guard.next_answer_id),
                question_id,
                draft.content.clone(),
                draft.is_correct,
            );
            guard.options.insert(option.id, option.clone());
            options.push(option);
        }
        Ok(options)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn assign_package(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.packages.contains_key(&package_id) {
            return Err(StorageError::NotFound);
        }
        let assigned = guard.assignments.entry(kid_id).or_default();
        if !assigned.contains(&package_id) {
            assigned.push(package_id);
        }
        Ok(())
    }

    async fn unassign_package(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if let Some(assigned) = guard.assignments.get_mut(&kid_id) {
            assigned.retain(|p| *p != package_id);
        }
        Ok(())
    }

    async fn assigned_packages(&self, kid_id: KidId) -> Result<Vec<PackageId>, StorageError> {
        Ok(self
            .lock()?
            .assignments
            .get(&kid_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl WrongAnswerRepository for InMemoryRepository {
    async fn append_wrong_answer(&self, record: &WrongAnswer) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        guard.wrong_answers.push(record.clone());
        i64::try_from(guard.wrong_answers.len())
            .map_err(|_| StorageError::Serialization("wrong answer id overflow".into()))
    }

    async fn list_wrong_answers(
        &self,
        kid_id: KidId,
        limit: u32,
    ) -> Result<Vec<WrongAnswer>, StorageError> {
        let guard = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .wrong_answers
            .iter()
            .rev()
            .filter(|w| w.kid_id == kid_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub packages: Arc<dyn PackageRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub wrong_answers: Arc<dyn WrongAnswerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    pub(crate) fn from_repo<R>(repo: R) -> Self
    where
        R: PackageRepository
            + QuestionRepository
            + AnswerRepository
            + AssignmentRepository
            + WrongAnswerRepository
            + Clone
            + 'static,
    {
        Self {
            packages: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            wrong_answers: Arc::new(repo),
        }
    }
}
