use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use quiz_core::model::{AnswerOption, Question, QuestionId};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::backend::QuizBackend;
use crate::error::BackendError;
use crate::shuffle::ShuffleSource;

pub const DEFAULT_PREFETCH_AHEAD: usize = 2;

/// Result of asking the cache for a question's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionLoad {
    /// Served from the cache; no fetch happened.
    Cached(Vec<AnswerOption>),
    /// Another load for the same question is running; this request was dropped.
    InFlight,
    /// Fetched now. Empty when the fetch failed.
    Loaded(Vec<AnswerOption>),
}

#[derive(Debug, Default)]
struct CacheState {
    options: HashMap<QuestionId, Vec<AnswerOption>>,
    loading: HashSet<QuestionId>,
}

/// Per-session cache of shuffled answer options.
///
/// Order is fixed when an entry is stored; later reads return it unchanged.
#[derive(Debug)]
pub struct OptionCache {
    state: Mutex<CacheState>,
    settled: Notify,
    prefetch_ahead: usize,
    fetch_timeout: Duration,
}

impl OptionCache {
    #[must_use]
    pub fn new(prefetch_ahead: usize, fetch_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            settled: Notify::new(),
            prefetch_ahead,
            fetch_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<Vec<AnswerOption>> {
        self.lock().options.get(&question_id).cloned()
    }

    pub fn set(&self, question_id: QuestionId, options: Vec<AnswerOption>) {
        self.lock().options.insert(question_id, options);
    }

    #[must_use]
    pub fn is_loading(&self, question_id: QuestionId) -> bool {
        self.lock().loading.contains(&question_id)
    }

    /// Resolves after the next load or prefetch finishes.
    ///
    /// Create the future before checking state so a finish in between is not missed.
    pub fn settled(&self) -> tokio::sync::futures::Notified<'_> {
        self.settled.notified()
    }

    /// Options for one question, fetching and shuffling them on a miss.
    pub async fn load(
        &self,
        backend: &dyn QuizBackend,
        shuffle: &ShuffleSource,
        question_id: QuestionId,
    ) -> OptionLoad {
        {
            let mut state = self.lock();
            if let Some(options) = state.options.get(&question_id) {
                return OptionLoad::Cached(options.clone());
            }
            if !state.loading.insert(question_id) {
                debug!(question_id = %question_id, "option load already in flight");
                return OptionLoad::InFlight;
            }
        }

        let fetched = self.fetch(backend, &[question_id]).await;

        let options = {
            let mut state = self.lock();
            state.loading.remove(&question_id);
            match fetched {
                Ok(fetched) => {
                    let mut options: Vec<AnswerOption> = fetched
                        .into_iter()
                        .filter(|o| o.question_id == question_id)
                        .collect();
                    shuffle.shuffle(&mut options);
                    state.options.insert(question_id, options.clone());
                    options
                }
                Err(e) => {
                    warn!(question_id = %question_id, error = %e, "loading answer options failed");
                    Vec::new()
                }
            }
        };
        self.settled.notify_waiters();
        OptionLoad::Loaded(options)
    }

    /// Fetch options for the next few questions after `current_index` in one batch.
    ///
    /// Questions already cached or loading are skipped. Returns the ids stored.
    pub async fn prefetch_ahead(
        &self,
        backend: &dyn QuizBackend,
        shuffle: &ShuffleSource,
        questions: &[Question],
        current_index: usize,
    ) -> Vec<QuestionId> {
        let start = current_index.saturating_add(1).min(questions.len());
        let end = start.saturating_add(self.prefetch_ahead).min(questions.len());

        let targets: Vec<QuestionId> = {
            let mut state = self.lock();
            let wanted: Vec<QuestionId> = questions[start..end]
                .iter()
                .map(Question::id)
                .filter(|id| !state.options.contains_key(id) && !state.loading.contains(id))
                .collect();
            state.loading.extend(wanted.iter().copied());
            wanted
        };
        if targets.is_empty() {
            return targets;
        }

        let fetched = self.fetch(backend, &targets).await;

        let stored = {
            let mut state = self.lock();
            for id in &targets {
                state.loading.remove(id);
            }
            match fetched {
                Ok(fetched) => {
                    let mut grouped: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
                    for option in fetched {
                        grouped.entry(option.question_id).or_default().push(option);
                    }
                    let mut stored = Vec::with_capacity(targets.len());
                    for id in &targets {
                        let mut options = grouped.remove(id).unwrap_or_default();
                        shuffle.shuffle(&mut options);
                        state.options.insert(*id, options);
                        stored.push(*id);
                    }
                    stored
                }
                Err(e) => {
                    warn!(count = targets.len(), error = %e, "prefetching answer options failed");
                    Vec::new()
                }
            }
        };
        self.settled.notify_waiters();
        debug!(count = stored.len(), "prefetched answer options");
        stored
    }

    async fn fetch(
        &self,
        backend: &dyn QuizBackend,
        ids: &[QuestionId],
    ) -> Result<Vec<AnswerOption>, String> {
        match tokio::time::timeout(self.fetch_timeout, backend.fetch_answer_options(ids)).await {
            Ok(res) => res.map_err(|e: BackendError| e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.fetch_timeout)),
        }
    }
}
