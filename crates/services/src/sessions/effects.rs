use std::time::Duration;

use quiz_core::FeedbackTimings;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
    TimeUp,
}

/// A feedback cue shown after a question resolves.
///
/// The cue holds back the next transition until its display and settle time
/// have both elapsed. It stops being visible on dismissal or once the
/// auto-hide limit passes, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    kind: FeedbackKind,
    shown_at: Instant,
    display: Duration,
    settle: Duration,
    auto_hide: Duration,
    dismissed: bool,
}

impl Feedback {
    #[must_use]
    pub fn show(kind: FeedbackKind, now: Instant, timings: &FeedbackTimings) -> Self {
        let (display_ms, settle_ms) = match kind {
            FeedbackKind::Correct => (timings.correct_display_ms, timings.correct_settle_ms),
            FeedbackKind::Incorrect => (timings.incorrect_display_ms, timings.incorrect_settle_ms),
            FeedbackKind::TimeUp => (timings.time_up_countdown_ms, timings.time_up_settle_ms),
        };
        Self {
            kind,
            shown_at: now,
            display: Duration::from_millis(display_ms),
            settle: Duration::from_millis(settle_ms),
            auto_hide: timings.auto_hide(),
            dismissed: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FeedbackKind {
        self.kind
    }

    #[must_use]
    pub fn shown_at(&self) -> Instant {
        self.shown_at
    }

    /// Earliest instant the next transition may run.
    #[must_use]
    pub fn gate_until(&self) -> Instant {
        self.shown_at + self.display + self.settle
    }

    #[must_use]
    pub fn is_visible(&self, now: Instant) -> bool {
        !self.dismissed && now < self.shown_at + self.auto_hide
    }

    /// Whole seconds left on the time-up panel, rounded up. `None` for other cues.
    #[must_use]
    pub fn countdown_remaining(&self, now: Instant) -> Option<u64> {
        if self.kind != FeedbackKind::TimeUp {
            return None;
        }
        let left = (self.shown_at + self.display).saturating_duration_since(now);
        Some(left.as_millis().div_ceil(1_000).try_into().unwrap_or(u64::MAX))
    }

    pub fn dismiss(&mut self) {
        self.dismissed = true;
    }

    #[must_use]
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn gates_follow_default_timings() {
        let timings = FeedbackTimings::default();
        let t0 = Instant::now();

        let correct = Feedback::show(FeedbackKind::Correct, t0, &timings);
        let incorrect = Feedback::show(FeedbackKind::Incorrect, t0, &timings);
        let time_up = Feedback::show(FeedbackKind::TimeUp, t0, &timings);

        assert_eq!(correct.gate_until(), t0 + ms(1_500));
        assert_eq!(incorrect.gate_until(), t0 + ms(2_500));
        assert_eq!(time_up.gate_until(), t0 + ms(5_000));
    }

    #[test]
    fn auto_hide_clears_a_lingering_cue() {
        let timings = FeedbackTimings::default();
        let t0 = Instant::now();
        let cue = Feedback::show(FeedbackKind::Incorrect, t0, &timings);

        assert!(cue.is_visible(t0 + ms(5_999)));
        assert!(!cue.is_visible(t0 + ms(6_000)));
    }

    #[test]
    fn dismiss_hides_immediately() {
        let t0 = Instant::now();
        let mut cue = Feedback::show(FeedbackKind::Correct, t0, &FeedbackTimings::default());
        cue.dismiss();
        assert!(cue.is_dismissed());
        assert!(!cue.is_visible(t0));
    }

    #[test]
    fn time_up_countdown_runs_five_to_zero() {
        let t0 = Instant::now();
        let cue = Feedback::show(FeedbackKind::TimeUp, t0, &FeedbackTimings::default());

        assert_eq!(cue.countdown_remaining(t0), Some(5));
        assert_eq!(cue.countdown_remaining(t0 + ms(1)), Some(5));
        assert_eq!(cue.countdown_remaining(t0 + ms(1_000)), Some(4));
        assert_eq!(cue.countdown_remaining(t0 + ms(4_500)), Some(1));
        assert_eq!(cue.countdown_remaining(t0 + ms(9_000)), Some(0));

        let other = Feedback::show(FeedbackKind::Correct, t0, &FeedbackTimings::default());
        assert_eq!(other.countdown_remaining(t0), None);
    }
}
