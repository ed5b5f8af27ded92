use std::collections::BTreeMap;

use quiz_core::model::{
    AnswerId, AnswerOption, KidAnswer, KidId, PackageId, Question, QuestionId, SessionSummary,
    WrongAnswer,
};
use quiz_core::{Clock, SessionSettings};
use tokio::time::Instant;
use tracing::debug;

use crate::error::SessionError;

use super::effects::{Feedback, FeedbackKind};
use super::recorder::AnswerRecorder;

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The kid has no assigned packages.
    NoPackages,
    /// The packages hold no questions, or they could not be loaded.
    NoQuestions,
    /// Looking up the assigned packages failed.
    FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configuring,
    AwaitingQuestion,
    QuestionActive,
    AnswerSubmitted,
    Transitioning,
    Complete,
    Closed(CloseReason),
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Closed(_))
    }
}

/// Presentation flag for one answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// Highlighted by the player, not yet submitted.
    Selected,
    Correct,
    Incorrect,
}

//
// ─── RESOLUTION & TRANSITIONS ──────────────────────────────────────────────────
//

/// Outcome of answering or timing out on a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub question_id: QuestionId,
    pub answer: KidAnswer,
    pub feedback: FeedbackKind,
    pub wrong_answer: Option<WrongAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub token: TransitionToken,
    /// When the feedback gate opens and the transition may complete.
    pub due_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStart {
    Scheduled(PendingTransition),
    /// Nothing has been resolved yet.
    NotReady,
    /// A transition is already pending.
    InProgress,
    /// The previous transition finished too recently.
    Debounced { retry_at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Advanced { index: usize },
    Completed,
    /// The token was cancelled or superseded.
    Stale,
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// Synchronous core of a quiz session.
///
/// Every operation takes the current instant and returns immediately; the
/// async runner owns timers and network calls.
#[derive(Debug)]
pub struct SessionMachine {
    settings: SessionSettings,
    clock: Clock,
    phase: SessionPhase,
    package_ids: Vec<PackageId>,
    questions: Vec<Question>,
    loaded: bool,
    index: usize,
    options: Vec<AnswerOption>,
    remaining_secs: Option<u32>,
    marks: BTreeMap<AnswerId, OptionMark>,
    feedback: Option<Feedback>,
    pending: Option<PendingTransition>,
    next_token: u64,
    last_transition_at: Option<Instant>,
    recorder: AnswerRecorder,
}

impl SessionMachine {
    #[must_use]
    pub fn new(kid_id: KidId, settings: SessionSettings, clock: Clock) -> Self {
        Self {
            settings,
            clock,
            phase: SessionPhase::Configuring,
            package_ids: Vec::new(),
            questions: Vec::new(),
            loaded: false,
            index: 0,
            options: Vec::new(),
            remaining_secs: None,
            marks: BTreeMap::new(),
            feedback: None,
            pending: None,
            next_token: 0,
            last_transition_at: None,
            recorder: AnswerRecorder::new(kid_id),
        }
    }

    /// Record the packages to draw from. No packages closes the session quietly.
    pub fn configure(&mut self, package_ids: Vec<PackageId>) -> bool {
        if self.phase != SessionPhase::Configuring {
            return false;
        }
        if package_ids.is_empty() {
            self.close(CloseReason::NoPackages);
            return false;
        }
        self.package_ids = package_ids;
        true
    }

    /// Fix the question sequence. Only the first call has an effect.
    pub fn load_questions(&mut self, questions: Vec<Question>) -> bool {
        if self.loaded || self.phase != SessionPhase::Configuring {
            return false;
        }
        self.loaded = true;
        if questions.is_empty() {
            self.close(CloseReason::NoQuestions);
            return false;
        }
        debug!(count = questions.len(), "session questions loaded");
        self.questions = questions;
        self.index = 0;
        self.phase = SessionPhase::AwaitingQuestion;
        true
    }

    pub fn close(&mut self, reason: CloseReason) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = SessionPhase::Closed(reason);
        self.remaining_secs = None;
        self.pending = None;
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// Show the current question's options and start its countdown.
    pub fn options_ready(&mut self, question_id: QuestionId, options: Vec<AnswerOption>) -> bool {
        if self.phase != SessionPhase::AwaitingQuestion {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        if question.id() != question_id {
            return false;
        }
        self.remaining_secs = Some(question.time_limit_secs());
        self.options = options;
        self.phase = SessionPhase::QuestionActive;
        true
    }

    /// One countdown step. Reaching zero resolves the question as timed out.
    pub fn tick(&mut self, now: Instant) -> Option<Resolution> {
        if self.phase != SessionPhase::QuestionActive {
            return None;
        }
        let remaining = self.remaining_secs.as_mut()?;
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            return self.time_up(now);
        }
        None
    }

    /// Highlight an option before submitting it.
    pub fn select(&mut self, answer_id: AnswerId) -> bool {
        if self.phase != SessionPhase::QuestionActive
            || !self.options.iter().any(|o| o.id == answer_id)
        {
            return false;
        }
        self.marks.retain(|_, mark| *mark != OptionMark::Selected);
        self.marks.insert(answer_id, OptionMark::Selected);
        true
    }

    /// # Errors
    ///
    /// `SessionError::NotAccepting` outside an active question,
    /// `SessionError::AlreadyResolved` after the question was answered or timed
    /// out, `SessionError::UnknownAnswer` for an id not among the options.
    pub fn submit_answer(
        &mut self,
        answer_id: AnswerId,
        now: Instant,
    ) -> Result<Resolution, SessionError> {
        match self.phase {
            SessionPhase::QuestionActive => {}
            SessionPhase::AnswerSubmitted | SessionPhase::Transitioning => {
                return Err(SessionError::AlreadyResolved);
            }
            _ => return Err(SessionError::NotAccepting),
        }
        let chosen = self
            .options
            .iter()
            .find(|o| o.id == answer_id)
            .cloned()
            .ok_or(SessionError::UnknownAnswer(answer_id))?;
        self.resolve(Some(chosen), now)
            .ok_or(SessionError::NotAccepting)
    }

    /// Resolve the active question as timed out. Ignored once resolved.
    pub fn time_up(&mut self, now: Instant) -> Option<Resolution> {
        if self.phase != SessionPhase::QuestionActive {
            return None;
        }
        self.resolve(None, now)
    }

    fn resolve(&mut self, chosen: Option<AnswerOption>, now: Instant) -> Option<Resolution> {
        let question = self.current_question()?.clone();
        self.remaining_secs = None;

        let recorded =
            self.recorder
                .record(&question, chosen.as_ref(), &self.options, self.clock.now());

        self.marks.clear();
        for option in self.options.iter().filter(|o| o.is_correct) {
            self.marks.insert(option.id, OptionMark::Correct);
        }
        if let Some(chosen) = chosen.as_ref().filter(|o| !o.is_correct) {
            self.marks.insert(chosen.id, OptionMark::Incorrect);
        }

        let kind = match (&chosen, recorded.answer.is_correct) {
            (None, _) => FeedbackKind::TimeUp,
            (Some(_), true) => FeedbackKind::Correct,
            (Some(_), false) => FeedbackKind::Incorrect,
        };
        self.feedback = Some(Feedback::show(kind, now, &self.settings.feedback));
        self.phase = SessionPhase::AnswerSubmitted;

        debug!(question_id = %question.id(), ?kind, "question resolved");
        Some(Resolution {
            question_id: question.id(),
            answer: recorded.answer,
            feedback: kind,
            wrong_answer: recorded.wrong_answer,
        })
    }

    /// Arm the move to the next question once feedback has played.
    pub fn begin_transition(&mut self, now: Instant) -> TransitionStart {
        if self.pending.is_some() {
            return TransitionStart::InProgress;
        }
        if self.phase != SessionPhase::AnswerSubmitted {
            return TransitionStart::NotReady;
        }
        if let Some(last) = self.last_transition_at {
            let retry_at = last + self.settings.transition_debounce();
            if now < retry_at {
                return TransitionStart::Debounced { retry_at };
            }
        }

        self.next_token += 1;
        let due_at = self
            .feedback
            .as_ref()
            .map_or(now, Feedback::gate_until)
            .max(now);
        let pending = PendingTransition {
            token: TransitionToken(self.next_token),
            due_at,
        };
        self.pending = Some(pending);
        self.phase = SessionPhase::Transitioning;
        TransitionStart::Scheduled(pending)
    }

    /// Advance by exactly one question if `token` is still the pending one.
    pub fn complete_transition(
        &mut self,
        token: TransitionToken,
        now: Instant,
    ) -> TransitionOutcome {
        match self.pending {
            Some(pending) if pending.token == token => {}
            _ => return TransitionOutcome::Stale,
        }
        self.pending = None;
        self.marks.clear();
        if let Some(feedback) = self.feedback.as_mut() {
            feedback.dismiss();
        }
        self.feedback = None;
        self.options.clear();
        self.index += 1;
        self.last_transition_at = Some(now);

        if self.index >= self.questions.len() {
            self.phase = SessionPhase::Complete;
            debug!(answered = self.recorder.history().len(), "session complete");
            TransitionOutcome::Completed
        } else {
            self.phase = SessionPhase::AwaitingQuestion;
            TransitionOutcome::Advanced { index: self.index }
        }
    }

    /// Disarm a pending transition. Returns `true` if one was pending.
    pub fn cancel_transition(&mut self) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        if self.phase == SessionPhase::Transitioning {
            self.phase = SessionPhase::AnswerSubmitted;
        }
        true
    }

    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        if self.phase != SessionPhase::Complete {
            return None;
        }
        SessionSummary::from_answers(self.questions.len(), self.recorder.history()).ok()
    }

    // Accessors
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn package_ids(&self) -> &[PackageId] {
        &self.package_ids
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn timer_active(&self) -> bool {
        self.remaining_secs.is_some()
    }

    #[must_use]
    pub fn marks(&self) -> &BTreeMap<AnswerId, OptionMark> {
        &self.marks
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.pending
    }

    #[must_use]
    pub fn history(&self) -> &[KidAnswer] {
        self.recorder.history()
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.recorder.correct_count()
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.recorder.total_points()
    }
}
