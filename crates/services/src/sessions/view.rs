use quiz_core::model::{AnswerId, QuestionId};
use tokio::time::Instant;

use super::effects::FeedbackKind;
use super::machine::{OptionMark, SessionMachine};

/// Presentation-agnostic snapshot of one answer option.
///
/// No formatting and no layout; the front end decides how to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub id: AnswerId,
    pub content: String,
    pub mark: Option<OptionMark>,
}

/// The visible part of a feedback cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackView {
    pub kind: FeedbackKind,
    /// Seconds left on the time-up panel.
    pub countdown_secs: Option<u64>,
}

/// Snapshot of the current question for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// Zero-based position in the sequence.
    pub index: usize,
    pub total: usize,
    pub question_id: QuestionId,
    pub content: String,
    pub points: u32,
    pub options: Vec<OptionView>,
    pub remaining_secs: Option<u32>,
    pub feedback: Option<FeedbackView>,
}

impl QuestionView {
    /// Build a view of the machine's current question, if there is one.
    #[must_use]
    pub fn from_machine(machine: &SessionMachine, now: Instant) -> Option<Self> {
        let question = machine.current_question()?;
        let options = machine
            .options()
            .iter()
            .map(|o| OptionView {
                id: o.id,
                content: o.content.clone(),
                mark: machine.marks().get(&o.id).copied(),
            })
            .collect();
        let feedback = machine
            .feedback()
            .filter(|f| f.is_visible(now))
            .map(|f| FeedbackView {
                kind: f.kind(),
                countdown_secs: f.countdown_remaining(now),
            });

        Some(Self {
            index: machine.index(),
            total: machine.total(),
            question_id: question.id(),
            content: question.content().to_owned(),
            points: question.points(),
            options,
            remaining_secs: machine.remaining_secs(),
            feedback,
        })
    }

    /// One-based position, as shown to the player.
    #[must_use]
    pub fn number(&self) -> usize {
        self.index + 1
    }
}
