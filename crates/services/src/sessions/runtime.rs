use std::sync::Arc;

use quiz_core::model::{AnswerId, AnswerOption, KidId, Question, QuestionId, SessionSummary};
use quiz_core::{Clock, SessionSettings};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::QuizBackend;
use crate::error::SessionError;
use crate::notifier::{Notice, NoticeLatch, Notifier};
use crate::shuffle::ShuffleSource;

use super::effects::FeedbackKind;
use super::loader::QuestionLoader;
use super::machine::{
    CloseReason, PendingTransition, Resolution, SessionMachine, TransitionOutcome, TransitionStart,
};
use super::option_cache::{OptionCache, OptionLoad};
use super::recorder::AnswerRecorder;
use super::request::RequestController;
use super::view::QuestionView;

const ASSIGNED_FETCH_FAILED: &str = "Could not load your quizzes. Please try again later.";

/// What the player can do while a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Choose(AnswerId),
    Highlight(AnswerId),
    Quit,
}

/// Everything the rendering layer needs to follow a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QuestionShown(QuestionView),
    Highlighted(QuestionView),
    Tick { remaining_secs: u32 },
    Resolved {
        resolution: Resolution,
        view: QuestionView,
    },
    /// Seconds left on the time-up panel before the next question.
    FeedbackCountdown { remaining_secs: u64 },
    Rejected(SessionError),
    Completed(SessionSummary),
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(SessionSummary),
    Closed(CloseReason),
    Quit,
}

/// Drives one kid's session from assigned packages to summary.
#[derive(Clone)]
///
/// Clones share one notice latch, so a failed package lookup is reported once
/// per runner however many sessions it starts.
pub struct SessionRunner {
    backend: Arc<dyn QuizBackend>,
    notices: Arc<NoticeLatch>,
    shuffle: Arc<ShuffleSource>,
    settings: SessionSettings,
    clock: Clock,
}

impl SessionRunner {
    #[must_use]
    pub fn new(backend: Arc<dyn QuizBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notices: Arc::new(NoticeLatch::new(notifier)),
            shuffle: Arc::new(ShuffleSource::default()),
            settings: SessionSettings::default(),
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: Arc<ShuffleSource>) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run a session until it completes, closes, or the player quits.
    ///
    /// A closed input channel counts as quitting. Wrong answers still being
    /// stored are awaited before returning.
    pub async fn run(
        &self,
        kid_id: KidId,
        mut inputs: mpsc::Receiver<PlayerInput>,
        events: mpsc::Sender<SessionEvent>,
    ) -> SessionOutcome {
        info!(kid_id = %kid_id, "session started");
        let mut session = Session::new(self, kid_id, &events);
        let outcome = session.drive(&mut inputs).await;
        session.teardown().await;
        info!(kid_id = %kid_id, ?outcome, "session finished");
        outcome
    }
}

enum Wake {
    Transition(PendingTransition),
    Retry(Instant),
}

impl Wake {
    fn at(&self) -> Instant {
        match self {
            Wake::Transition(pending) => pending.due_at,
            Wake::Retry(at) => *at,
        }
    }
}

enum Step {
    Next,
    Done(SessionOutcome),
}

struct Session<'a> {
    runner: &'a SessionRunner,
    events: &'a mpsc::Sender<SessionEvent>,
    kid_id: KidId,
    machine: SessionMachine,
    controller: RequestController,
    cache: Arc<OptionCache>,
    questions: Arc<[Question]>,
    prefetches: JoinSet<()>,
    persists: JoinSet<bool>,
}

impl<'a> Session<'a> {
    fn new(runner: &'a SessionRunner, kid_id: KidId, events: &'a mpsc::Sender<SessionEvent>) -> Self {
        let settings = runner.settings;
        Self {
            runner,
            events,
            kid_id,
            machine: SessionMachine::new(kid_id, settings, runner.clock),
            controller: RequestController::new(settings.request_timeout()),
            cache: Arc::new(OptionCache::new(
                settings.prefetch_ahead,
                settings.request_timeout(),
            )),
            questions: Arc::from(Vec::new()),
            prefetches: JoinSet::new(),
            persists: JoinSet::new(),
        }
    }

    async fn drive(&mut self, inputs: &mut mpsc::Receiver<PlayerInput>) -> SessionOutcome {
        let scope = self.controller.begin();
        let assigned = match scope
            .run(self.runner.backend.fetch_assigned_packages(self.kid_id))
            .await
        {
            Ok(Ok(ids)) => Ok(ids),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let package_ids = match assigned {
            Ok(ids) => ids,
            Err(error) => {
                warn!(kid_id = %self.kid_id, %error, "loading assigned packages failed");
                if !self.runner.notices.notify_once(Notice::error(ASSIGNED_FETCH_FAILED)) {
                    debug!("failure notice already shown");
                }
                return self.close(CloseReason::FetchFailed).await;
            }
        };

        if !self.machine.configure(package_ids) {
            debug!(kid_id = %self.kid_id, "no packages assigned");
            return self.close(CloseReason::NoPackages).await;
        }

        let loader = QuestionLoader::new(
            Arc::clone(&self.runner.backend),
            Arc::clone(&self.runner.shuffle),
        );
        let questions = loader
            .load_scoped(&self.controller, self.machine.package_ids())
            .await;
        if !self.machine.load_questions(questions) {
            return self.close(CloseReason::NoQuestions).await;
        }
        self.questions = Arc::from(self.machine.questions());

        loop {
            let Some(question_id) = self.machine.current_question().map(Question::id) else {
                return self.close(CloseReason::NoQuestions).await;
            };
            let options = self.options_for(question_id).await;
            self.machine.options_ready(question_id, options);
            self.spawn_prefetch();

            if let Some(view) = QuestionView::from_machine(&self.machine, Instant::now()) {
                self.emit(SessionEvent::QuestionShown(view)).await;
            }

            match self.play_question(inputs).await {
                Step::Next => {}
                Step::Done(outcome) => return outcome,
            }
        }
    }

    /// Input, countdown, and the delayed transition for the current question.
    async fn play_question(&mut self, inputs: &mut mpsc::Receiver<PlayerInput>) -> Step {
        let tick = self.runner.settings.tick_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut wake: Option<Wake> = None;

        loop {
            let wake_at = wake.as_ref().map(Wake::at);
            let ticking = self.machine.timer_active() || self.time_up_showing(Instant::now());

            tokio::select! {
                biased;

                input = inputs.recv() => match input {
                    None | Some(PlayerInput::Quit) => return Step::Done(SessionOutcome::Quit),
                    Some(PlayerInput::Highlight(answer_id)) => {
                        if self.machine.select(answer_id) {
                            self.emit_view(SessionEvent::Highlighted).await;
                        }
                    }
                    Some(PlayerInput::Choose(answer_id)) => {
                        match self.machine.submit_answer(answer_id, Instant::now()) {
                            Ok(resolution) => wake = self.resolved(resolution).await,
                            Err(e) => {
                                debug!(answer_id = %answer_id, error = %e, "answer rejected");
                                self.emit(SessionEvent::Rejected(e)).await;
                            }
                        }
                    }
                },

                () = tokio::time::sleep_until(wake_at.unwrap_or_else(Instant::now)), if wake_at.is_some() => {
                    let now = Instant::now();
                    match wake.take() {
                        Some(Wake::Transition(pending)) => {
                            match self.machine.complete_transition(pending.token, now) {
                                TransitionOutcome::Advanced { index } => {
                                    debug!(index, "advanced to next question");
                                    return Step::Next;
                                }
                                TransitionOutcome::Completed => return Step::Done(self.complete().await),
                                TransitionOutcome::Stale => {}
                            }
                        }
                        Some(Wake::Retry(_)) => wake = self.schedule(now),
                        None => {}
                    }
                },

                _ = ticker.tick(), if ticking => {
                    let now = Instant::now();
                    if let Some(resolution) = self.machine.tick(now) {
                        wake = self.resolved(resolution).await;
                    } else if let Some(remaining_secs) = self.machine.remaining_secs() {
                        self.emit(SessionEvent::Tick { remaining_secs }).await;
                    } else if let Some(remaining_secs) = self
                        .machine
                        .feedback()
                        .and_then(|f| f.countdown_remaining(now))
                        .filter(|secs| *secs > 0)
                    {
                        self.emit(SessionEvent::FeedbackCountdown { remaining_secs }).await;
                    }
                },
            }
        }
    }

    fn time_up_showing(&self, now: Instant) -> bool {
        self.machine
            .feedback()
            .is_some_and(|f| f.kind() == FeedbackKind::TimeUp && f.is_visible(now))
    }

    async fn resolved(&mut self, resolution: Resolution) -> Option<Wake> {
        if let Some(wrong) = resolution.wrong_answer.clone() {
            let backend = Arc::clone(&self.runner.backend);
            self.persists
                .spawn(async move { AnswerRecorder::persist(backend.as_ref(), &wrong).await });
        }

        let now = Instant::now();
        if let Some(view) = QuestionView::from_machine(&self.machine, now) {
            self.emit(SessionEvent::Resolved { resolution, view }).await;
        }
        self.schedule(now)
    }

    fn schedule(&mut self, now: Instant) -> Option<Wake> {
        match self.machine.begin_transition(now) {
            TransitionStart::Scheduled(pending) => Some(Wake::Transition(pending)),
            TransitionStart::Debounced { retry_at } => Some(Wake::Retry(retry_at)),
            TransitionStart::NotReady | TransitionStart::InProgress => None,
        }
    }

    async fn complete(&mut self) -> SessionOutcome {
        match self.machine.summary() {
            Some(summary) => {
                self.emit(SessionEvent::Completed(summary)).await;
                SessionOutcome::Completed(summary)
            }
            None => self.close(CloseReason::NoQuestions).await,
        }
    }

    async fn close(&mut self, reason: CloseReason) -> SessionOutcome {
        self.machine.close(reason);
        self.emit(SessionEvent::Closed(reason)).await;
        SessionOutcome::Closed(reason)
    }

    /// Options for the current question; waits out a prefetch that holds it.
    async fn options_for(&self, question_id: QuestionId) -> Vec<AnswerOption> {
        loop {
            let settled = self.cache.settled();
            match self
                .cache
                .load(self.runner.backend.as_ref(), &self.runner.shuffle, question_id)
                .await
            {
                OptionLoad::Cached(options) | OptionLoad::Loaded(options) => return options,
                OptionLoad::InFlight => {
                    let wait = self.runner.settings.request_timeout();
                    if tokio::time::timeout(wait, settled).await.is_err() {
                        warn!(question_id = %question_id, "waiting for answer options timed out");
                        return Vec::new();
                    }
                }
            }
        }
    }

    fn spawn_prefetch(&mut self) {
        let cache = Arc::clone(&self.cache);
        let backend = Arc::clone(&self.runner.backend);
        let shuffle = Arc::clone(&self.runner.shuffle);
        let questions = Arc::clone(&self.questions);
        let index = self.machine.index();
        self.prefetches.spawn(async move {
            cache
                .prefetch_ahead(backend.as_ref(), &shuffle, &questions, index)
                .await;
        });
    }

    async fn emit_view(&self, wrap: fn(QuestionView) -> SessionEvent) {
        if let Some(view) = QuestionView::from_machine(&self.machine, Instant::now()) {
            self.emit(wrap(view)).await;
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            debug!("session event receiver dropped");
        }
    }

    async fn teardown(&mut self) {
        self.controller.abort();
        self.prefetches.abort_all();
        while self.persists.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{NoticeLevel, RecordingNotifier};
    use crate::sessions::test_support::{FakeBackend, option, question, question_with};
    use quiz_core::model::PresentationOrder;
    use quiz_core::time::fixed_clock;
    use std::time::Duration;

    fn runner(backend: &Arc<FakeBackend>, notifier: &RecordingNotifier) -> SessionRunner {
        SessionRunner::new(backend.clone(), Arc::new(notifier.clone()))
            .with_shuffle(Arc::new(ShuffleSource::seeded(5)))
            .with_clock(fixed_clock())
    }

    fn with_questions(ids: &[u64]) -> Arc<FakeBackend> {
        let backend = FakeBackend::default();
        backend.set_order(1, PresentationOrder::Sequential);
        backend.assign(1, &[1]);
        for &id in ids {
            backend.add_questions(&[question(id, 1, id)]);
            backend.add_options(&[option(id * 10, id, true), option(id * 10 + 1, id, false)]);
        }
        Arc::new(backend)
    }

    /// Runs a session for kid 1, answering each shown question with `answer`.
    async fn play<F>(runner: SessionRunner, mut answer: F) -> (SessionOutcome, Vec<SessionEvent>)
    where
        F: FnMut(&QuestionView) -> Option<PlayerInput>,
    {
        let (input_tx, input_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let handle =
            tokio::spawn(async move { runner.run(KidId::new(1), input_rx, event_tx).await });

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            if let SessionEvent::QuestionShown(view) = &event {
                if let Some(input) = answer(view) {
                    input_tx.send(input).await.unwrap();
                }
            }
            events.push(event);
        }
        (handle.await.unwrap(), events)
    }

    fn correct(view: &QuestionView) -> Option<PlayerInput> {
        Some(PlayerInput::Choose(AnswerId::new(view.question_id.value() * 10)))
    }

    fn wrong(view: &QuestionView) -> Option<PlayerInput> {
        Some(PlayerInput::Choose(AnswerId::new(view.question_id.value() * 10 + 1)))
    }

    fn shown(events: &[SessionEvent]) -> Vec<(usize, u64)> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::QuestionShown(v) => Some((v.index, v.question_id.value())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_completes_with_summary() {
        let backend = with_questions(&[1, 2, 3]);
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), correct).await;

        let SessionOutcome::Completed(summary) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(summary.total_questions(), 3);
        assert_eq!(summary.correct(), 3);
        assert_eq!(summary.total_points(), 30);
        assert_eq!(shown(&events), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(events.last(), Some(&SessionEvent::Completed(summary)));
        assert!(backend.wrong_answers().is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn later_options_come_from_prefetch() {
        let backend = with_questions(&[1, 2, 3]);
        let notifier = RecordingNotifier::new();

        play(runner(&backend, &notifier), correct).await;

        // One load for the first question, one batched prefetch for the rest.
        assert_eq!(backend.option_fetches(), 2);
    }

    fn option_counts(events: &[SessionEvent]) -> Vec<(u64, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::QuestionShown(v) => Some((v.question_id.value(), v.options.len())),
                _ => None,
            })
            .collect()
    }

    fn slow_backend(ids: &[u64], latency: Duration) -> Arc<FakeBackend> {
        let backend = FakeBackend::default().with_latency(latency);
        backend.set_order(1, PresentationOrder::Sequential);
        backend.assign(1, &[1]);
        for &id in ids {
            backend.add_questions(&[question(id, 1, id)]);
            backend.add_options(&[option(id * 10, id, true), option(id * 10 + 1, id, false)]);
        }
        Arc::new(backend)
    }

    #[tokio::test(start_paused = true)]
    async fn question_waits_for_its_prefetch_instead_of_fetching_again() {
        // Each call takes 8s: assigned 0-8, orders 8-16, questions 16-24,
        // first options 24-32, prefetch of 2 and 3 from 32 to 40. The first
        // answer settles around 33.5, so question 2 comes up mid-prefetch.
        let backend = slow_backend(&[1, 2, 3], Duration::from_secs(8));
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), correct).await;

        assert_eq!(option_counts(&events), vec![(1, 2), (2, 2), (3, 2)]);
        assert_eq!(backend.option_fetches(), 2);
        assert!(matches!(outcome, SessionOutcome::Completed(s) if s.correct() == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prefetch_is_retried_by_the_waiting_question() {
        let backend = slow_backend(&[1, 2, 3], Duration::from_secs(8));
        let notifier = RecordingNotifier::new();
        let start = Instant::now();

        // Only the prefetch running from 32 to 40 sees the failure.
        let toggler = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                tokio::time::sleep_until(start + Duration::from_millis(32_500)).await;
                backend.fail_options(true);
                tokio::time::sleep_until(start + Duration::from_secs(44)).await;
                backend.fail_options(false);
            })
        };

        let (outcome, events) = play(runner(&backend, &notifier), correct).await;
        toggler.await.unwrap();

        assert_eq!(option_counts(&events), vec![(1, 2), (2, 2), (3, 2)]);
        // First load, failed prefetch, retry for question 2, prefetch of 3.
        assert_eq!(backend.option_fetches(), 4);
        assert!(matches!(outcome, SessionOutcome::Completed(s) if s.correct() == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_answers_are_persisted() {
        let backend = with_questions(&[1, 2]);
        let notifier = RecordingNotifier::new();

        let (outcome, _) = play(runner(&backend, &notifier), wrong).await;

        assert!(matches!(outcome, SessionOutcome::Completed(s) if s.correct() == 0));
        let stored = backend.wrong_answers();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].question_content, "Q1");
        assert_eq!(stored[0].answer_content, "A11");
        assert_eq!(stored[0].correct_content, "A10");
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_question_times_out_once() {
        let backend = FakeBackend::default();
        backend.assign(1, &[1]);
        backend.add_questions(&[question_with(1, 1, 0, 5, 10)]);
        backend.add_options(&[option(10, 1, true), option(11, 1, false)]);
        let backend = Arc::new(backend);
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), |_| None).await;

        let ticks: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Tick { remaining_secs } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![4, 3, 2, 1]);

        let resolved: Vec<&Resolution> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Resolved { resolution, .. } => Some(resolution),
                _ => None,
            })
            .collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].feedback, FeedbackKind::TimeUp);
        assert!(resolved[0].answer.timed_out);

        let countdown: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::FeedbackCountdown { remaining_secs } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![4, 3, 2, 1]);

        assert!(matches!(outcome, SessionOutcome::Completed(s) if s.answered() == 1));
        let stored = backend.wrong_answers();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].answer_id, None);
        assert_eq!(stored[0].answer_content, "");
    }

    #[tokio::test(start_paused = true)]
    async fn no_assigned_packages_closes_silently() {
        let backend = Arc::new(FakeBackend::default());
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), correct).await;

        assert_eq!(outcome, SessionOutcome::Closed(CloseReason::NoPackages));
        assert_eq!(events, vec![SessionEvent::Closed(CloseReason::NoPackages)]);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn packages_without_questions_close() {
        let backend = FakeBackend::default();
        backend.assign(1, &[1]);
        let backend = Arc::new(backend);
        let notifier = RecordingNotifier::new();

        let (outcome, _) = play(runner(&backend, &notifier), correct).await;

        assert_eq!(outcome, SessionOutcome::Closed(CloseReason::NoQuestions));
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn assigned_lookup_failure_notifies_once() {
        let backend = FakeBackend::default();
        backend.fail_assigned(true);
        let backend = Arc::new(backend);
        let notifier = RecordingNotifier::new();

        let (outcome, _) = play(runner(&backend, &notifier), correct).await;

        assert_eq!(outcome, SessionOutcome::Closed(CloseReason::FetchFailed));
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_lookup_failures_share_one_notice() {
        let backend = FakeBackend::default();
        backend.fail_assigned(true);
        let backend = Arc::new(backend);
        let notifier = RecordingNotifier::new();
        let runner = runner(&backend, &notifier);

        let (first, _) = play(runner.clone(), correct).await;
        let (second, events) = play(runner, correct).await;

        assert_eq!(first, SessionOutcome::Closed(CloseReason::FetchFailed));
        assert_eq!(second, SessionOutcome::Closed(CloseReason::FetchFailed));
        assert_eq!(events, vec![SessionEvent::Closed(CloseReason::FetchFailed)]);
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_assigned_lookup_times_out() {
        let backend = Arc::new(FakeBackend::default().with_latency(Duration::from_secs(25)));
        backend.assign(1, &[1]);
        let notifier = RecordingNotifier::new();

        let (outcome, _) = play(runner(&backend, &notifier), correct).await;

        assert_eq!(outcome, SessionOutcome::Closed(CloseReason::FetchFailed));
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quitting_stops_the_session() {
        let backend = with_questions(&[1, 2]);
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), |_| Some(PlayerInput::Quit)).await;

        assert_eq!(outcome, SessionOutcome::Quit);
        assert_eq!(shown(&events), vec![(0, 1)]);
        assert!(backend.wrong_answers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_answer_is_rejected_and_timer_keeps_running() {
        let backend = FakeBackend::default();
        backend.assign(1, &[1]);
        backend.add_questions(&[question_with(1, 1, 0, 5, 10)]);
        backend.add_options(&[option(10, 1, true), option(11, 1, false)]);
        let backend = Arc::new(backend);
        let notifier = RecordingNotifier::new();

        let (outcome, events) = play(runner(&backend, &notifier), |_| {
            Some(PlayerInput::Choose(AnswerId::new(999)))
        })
        .await;

        assert!(events.contains(&SessionEvent::Rejected(SessionError::UnknownAnswer(
            AnswerId::new(999)
        ))));
        assert!(matches!(outcome, SessionOutcome::Completed(s) if s.correct() == 0));
    }
}
