use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quiz_core::model::{PackageId, PresentationOrder, Question};
use tracing::{debug, warn};

use crate::backend::QuizBackend;
use crate::shuffle::ShuffleSource;

use super::request::RequestController;

/// Builds the ordered question sequence for a session.
#[derive(Clone)]
pub struct QuestionLoader {
    backend: Arc<dyn QuizBackend>,
    shuffle: Arc<ShuffleSource>,
}

impl QuestionLoader {
    #[must_use]
    pub fn new(backend: Arc<dyn QuizBackend>, shuffle: Arc<ShuffleSource>) -> Self {
        Self { backend, shuffle }
    }

    /// Questions of every selected package, in selection order, deduplicated.
    ///
    /// An unreadable presentation order falls back to shuffling. An unreadable
    /// question list yields an empty sequence.
    pub async fn load(&self, package_ids: &[PackageId]) -> Vec<Question> {
        if package_ids.is_empty() {
            return Vec::new();
        }

        let orders: HashMap<PackageId, PresentationOrder> =
            match self.backend.fetch_package_orders(package_ids).await {
                Ok(orders) => orders.into_iter().map(|o| (o.package_id, o.order)).collect(),
                Err(e) => {
                    warn!(error = %e, "package orders unavailable, shuffling every package");
                    HashMap::new()
                }
            };

        let questions = match self.backend.fetch_questions(package_ids).await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "loading questions failed");
                return Vec::new();
            }
        };

        let sequence = arrange(package_ids, &orders, questions, &self.shuffle);
        debug!(packages = package_ids.len(), questions = sequence.len(), "question sequence loaded");
        sequence
    }

    /// `load` inside a fresh request scope; a cancelled or timed-out scope yields nothing.
    pub async fn load_scoped(
        &self,
        controller: &RequestController,
        package_ids: &[PackageId],
    ) -> Vec<Question> {
        let scope = controller.begin();
        match scope.run(self.load(package_ids)).await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "question load abandoned");
                Vec::new()
            }
        }
    }
}

/// Group by package, order each block, concatenate in selection order and
/// drop repeated question ids.
pub fn arrange(
    package_ids: &[PackageId],
    orders: &HashMap<PackageId, PresentationOrder>,
    questions: Vec<Question>,
    shuffle: &ShuffleSource,
) -> Vec<Question> {
    let mut by_package: HashMap<PackageId, Vec<Question>> = HashMap::new();
    for question in questions {
        by_package
            .entry(question.package_id())
            .or_default()
            .push(question);
    }

    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    let mut sequence = Vec::new();
    for package_id in package_ids {
        if !visited.insert(*package_id) {
            continue;
        }
        let Some(mut block) = by_package.remove(package_id) else {
            continue;
        };
        match orders.get(package_id).copied().unwrap_or_default() {
            PresentationOrder::Shuffle => shuffle.shuffle(&mut block),
            PresentationOrder::Sequential => {
                block.sort_by_key(|q| (q.created_at(), q.id()));
            }
        }
        sequence.extend(block.into_iter().filter(|q| seen.insert(q.id())));
    }
    sequence
}
