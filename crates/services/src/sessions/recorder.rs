use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerOption, KidAnswer, KidId, Question, WrongAnswer, correct_option};
use tracing::{debug, warn};

use crate::backend::QuizBackend;

/// What one resolved question added to the session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub answer: KidAnswer,
    /// Set when the answer was wrong or timed out; destined for the backend.
    pub wrong_answer: Option<WrongAnswer>,
}

/// Session-local answer history and running score.
#[derive(Debug, Clone)]
pub struct AnswerRecorder {
    kid_id: KidId,
    history: Vec<KidAnswer>,
    correct: u32,
    points: u32,
}

impl AnswerRecorder {
    #[must_use]
    pub fn new(kid_id: KidId) -> Self {
        Self {
            kid_id,
            history: Vec::new(),
            correct: 0,
            points: 0,
        }
    }

    /// Append the outcome for `question`. `chosen` is `None` on time-up.
    pub fn record(
        &mut self,
        question: &Question,
        chosen: Option<&AnswerOption>,
        options: &[AnswerOption],
        answered_at: DateTime<Utc>,
    ) -> Recorded {
        let is_correct = chosen.is_some_and(|o| o.is_correct);
        let points_awarded = if is_correct { question.points() } else { 0 };

        let answer = KidAnswer {
            question_id: question.id(),
            answer_id: chosen.map(|o| o.id),
            is_correct,
            points_awarded,
            timed_out: chosen.is_none(),
            answered_at,
        };
        self.history.push(answer.clone());
        if is_correct {
            self.correct = self.correct.saturating_add(1);
            self.points = self.points.saturating_add(points_awarded);
        }

        let wrong_answer = (!is_correct).then(|| WrongAnswer {
            kid_id: self.kid_id,
            question_id: question.id(),
            answer_id: chosen.map(|o| o.id),
            question_content: question.content().to_owned(),
            answer_content: chosen.map(|o| o.content.clone()).unwrap_or_default(),
            correct_content: correct_option(options)
                .map(|o| o.content.clone())
                .unwrap_or_default(),
            recorded_at: answered_at,
        });

        Recorded {
            answer,
            wrong_answer,
        }
    }

    /// Store a wrong answer for later review. Failures are logged and dropped.
    pub async fn persist(backend: &dyn QuizBackend, record: &WrongAnswer) -> bool {
        match backend.persist_wrong_answer(record).await {
            Ok(()) => {
                debug!(question_id = %record.question_id, "wrong answer stored");
                true
            }
            Err(e) => {
                warn!(question_id = %record.question_id, error = %e, "storing wrong answer failed");
                false
            }
        }
    }

    #[must_use]
    pub fn kid_id(&self) -> KidId {
        self.kid_id
    }

    #[must_use]
    pub fn history(&self) -> &[KidAnswer] {
        &self.history
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.points
    }
}
