use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerId, AnswerOption, KidId, PackageId, PackageOrder, PresentationOrder, Question,
    QuestionId, WrongAnswer,
};
use quiz_core::time::fixed_now_plus;

use crate::backend::QuizBackend;
use crate::error::BackendError;

pub(crate) fn question(id: u64, package: u64, created_offset: u64) -> Question {
    question_with(id, package, created_offset, 30, 10)
}

pub(crate) fn question_with(
    id: u64,
    package: u64,
    created_offset: u64,
    time_limit_secs: u32,
    points: u32,
) -> Question {
    Question::new(
        QuestionId::new(id),
        PackageId::new(package),
        format!("Q{id}"),
        time_limit_secs,
        points,
        fixed_now_plus(i64::try_from(created_offset).unwrap()),
    )
    .unwrap()
}

pub(crate) fn option(id: u64, question: u64, is_correct: bool) -> AnswerOption {
    AnswerOption::new(
        AnswerId::new(id),
        QuestionId::new(question),
        format!("A{id}"),
        is_correct,
    )
}

#[derive(Default)]
struct FakeState {
    orders: Vec<PackageOrder>,
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
    assigned: HashMap<KidId, Vec<PackageId>>,
    wrong_answers: Vec<WrongAnswer>,
    option_fetches: usize,
    last_option_request: Vec<QuestionId>,
    fail_orders: bool,
    fail_questions: bool,
    fail_options: bool,
    fail_assigned: bool,
    fail_persist: bool,
}

/// In-process `QuizBackend` with switchable failures and optional latency.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    latency: Option<Duration>,
}

impl FakeBackend {
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn failure() -> BackendError {
        BackendError::InvalidData("injected failure".into())
    }

    pub(crate) fn set_order(&self, package: u64, order: PresentationOrder) {
        self.lock().orders.push(PackageOrder {
            package_id: PackageId::new(package),
            order,
        });
    }

    pub(crate) fn add_questions(&self, questions: &[Question]) {
        self.lock().questions.extend_from_slice(questions);
    }

    pub(crate) fn add_options(&self, options: &[AnswerOption]) {
        self.lock().options.extend_from_slice(options);
    }

    pub(crate) fn assign(&self, kid: u64, packages: &[u64]) {
        self.lock().assigned.insert(
            KidId::new(kid),
            packages.iter().copied().map(PackageId::new).collect(),
        );
    }

    pub(crate) fn fail_orders(&self, fail: bool) {
        self.lock().fail_orders = fail;
    }

    pub(crate) fn fail_questions(&self, fail: bool) {
        self.lock().fail_questions = fail;
    }

    pub(crate) fn fail_options(&self, fail: bool) {
        self.lock().fail_options = fail;
    }

    pub(crate) fn fail_assigned(&self, fail: bool) {
        self.lock().fail_assigned = fail;
    }

    pub(crate) fn fail_persist(&self, fail: bool) {
        self.lock().fail_persist = fail;
    }

    pub(crate) fn option_fetches(&self) -> usize {
        self.lock().option_fetches
    }

    pub(crate) fn last_option_request(&self) -> Vec<QuestionId> {
        self.lock().last_option_request.clone()
    }

    pub(crate) fn wrong_answers(&self) -> Vec<WrongAnswer> {
        self.lock().wrong_answers.clone()
    }
}

#[async_trait]
impl QuizBackend for FakeBackend {
    async fn fetch_package_orders(
        &self,
        ids: &[PackageId],
    ) -> Result<Vec<PackageOrder>, BackendError> {
        self.delay().await;
        let state = self.lock();
        if state.fail_orders {
            return Err(Self::failure());
        }
        Ok(state
            .orders
            .iter()
            .filter(|o| ids.contains(&o.package_id))
            .copied()
            .collect())
    }

    async fn fetch_questions(&self, ids: &[PackageId]) -> Result<Vec<Question>, BackendError> {
        self.delay().await;
        let state = self.lock();
        if state.fail_questions {
            return Err(Self::failure());
        }
        Ok(state
            .questions
            .iter()
            .filter(|q| ids.contains(&q.package_id()))
            .cloned()
            .collect())
    }

    async fn fetch_answer_options(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, BackendError> {
        {
            let mut state = self.lock();
            state.option_fetches += 1;
            state.last_option_request = ids.to_vec();
        }
        self.delay().await;
        let state = self.lock();
        if state.fail_options {
            return Err(Self::failure());
        }
        Ok(state
            .options
            .iter()
            .filter(|o| ids.contains(&o.question_id))
            .cloned()
            .collect())
    }

    async fn persist_wrong_answer(&self, record: &WrongAnswer) -> Result<(), BackendError> {
        self.delay().await;
        let mut state = self.lock();
        if state.fail_persist {
            return Err(Self::failure());
        }
        state.wrong_answers.push(record.clone());
        Ok(())
    }

    async fn fetch_assigned_packages(
        &self,
        kid_id: KidId,
    ) -> Result<Vec<PackageId>, BackendError> {
        self.delay().await;
        let state = self.lock();
        if state.fail_assigned {
            return Err(Self::failure());
        }
        Ok(state.assigned.get(&kid_id).cloned().unwrap_or_default())
    }
}
