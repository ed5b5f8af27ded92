use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("transition debounce must be > 0")]
    InvalidDebounce,

    #[error("request timeout must be > 0")]
    InvalidRequestTimeout,

    #[error("tick interval must be > 0")]
    InvalidTickInterval,

    #[error("feedback display durations must be > 0")]
    InvalidFeedbackDisplay,

    #[error("auto-hide ({auto_hide_ms}ms) must not be shorter than the longest display ({longest_ms}ms)")]
    AutoHideTooShort { auto_hide_ms: u64, longest_ms: u64 },
}

//
// ─── FEEDBACK TIMINGS ──────────────────────────────────────────────────────────
//

/// Durations for the feedback shown after each resolved question, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackTimings {
    pub correct_display_ms: u64,
    pub correct_settle_ms: u64,
    pub incorrect_display_ms: u64,
    pub incorrect_settle_ms: u64,
    pub time_up_countdown_ms: u64,
    pub time_up_settle_ms: u64,
    /// Safety net: any visible effect is hidden after this long.
    pub auto_hide_ms: u64,
}

impl Default for FeedbackTimings {
    fn default() -> Self {
        Self {
            correct_display_ms: 1_500,
            correct_settle_ms: 0,
            incorrect_display_ms: 2_000,
            incorrect_settle_ms: 500,
            time_up_countdown_ms: 5_000,
            time_up_settle_ms: 0,
            auto_hide_ms: 6_000,
        }
    }
}

impl FeedbackTimings {
    #[must_use]
    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }

    fn longest_display_ms(&self) -> u64 {
        self.correct_display_ms
            .max(self.incorrect_display_ms)
            .max(self.time_up_countdown_ms)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.correct_display_ms == 0
            || self.incorrect_display_ms == 0
            || self.time_up_countdown_ms == 0
        {
            return Err(SettingsError::InvalidFeedbackDisplay);
        }
        let longest_ms = self.longest_display_ms();
        if self.auto_hide_ms < longest_ms {
            return Err(SettingsError::AutoHideTooShort {
                auto_hide_ms: self.auto_hide_ms,
                longest_ms,
            });
        }
        Ok(())
    }
}

//
// ─── SESSION SETTINGS ──────────────────────────────────────────────────────────
//

/// Tunables for the quiz session runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Minimum interval between two completed transitions.
    pub transition_debounce_ms: u64,
    /// Hard timeout for a request scope.
    pub request_timeout_ms: u64,
    /// How many upcoming questions get their options prefetched.
    pub prefetch_ahead: usize,
    /// Countdown granularity.
    pub tick_interval_ms: u64,
    pub feedback: FeedbackTimings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            transition_debounce_ms: 800,
            request_timeout_ms: 20_000,
            prefetch_ahead: 2,
            tick_interval_ms: 1_000,
            feedback: FeedbackTimings::default(),
        }
    }
}

impl SessionSettings {
    /// Check that every duration is usable.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for zero durations or an auto-hide shorter than
    /// the longest feedback display.
    pub fn validate(self) -> Result<Self, SettingsError> {
        if self.transition_debounce_ms == 0 {
            return Err(SettingsError::InvalidDebounce);
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::InvalidRequestTimeout);
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::InvalidTickInterval);
        }
        self.feedback.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn transition_debounce(&self) -> Duration {
        Duration::from_millis(self.transition_debounce_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = SessionSettings::default().validate().unwrap();
        assert_eq!(settings.transition_debounce(), Duration::from_millis(800));
        assert_eq!(settings.request_timeout(), Duration::from_secs(20));
        assert_eq!(settings.prefetch_ahead, 2);
        assert_eq!(settings.feedback.auto_hide(), Duration::from_secs(6));
    }

    #[test]
    fn rejects_zero_debounce() {
        let settings = SessionSettings {
            transition_debounce_ms: 0,
            ..SessionSettings::default()
        };
        assert_eq!(settings.validate().unwrap_err(), SettingsError::InvalidDebounce);
    }

    #[test]
    fn rejects_auto_hide_shorter_than_countdown() {
        let settings = SessionSettings {
            feedback: FeedbackTimings {
                auto_hide_ms: 4_000,
                ..FeedbackTimings::default()
            },
            ..SessionSettings::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            SettingsError::AutoHideTooShort {
                auto_hide_ms: 4_000,
                longest_ms: 5_000
            }
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings: SessionSettings =
            serde_json::from_str(r#"{"prefetch_ahead": 3, "feedback": {"auto_hide_ms": 7000}}"#)
                .unwrap();
        assert_eq!(settings.prefetch_ahead, 3);
        assert_eq!(settings.transition_debounce_ms, 800);
        assert_eq!(settings.feedback.auto_hide_ms, 7_000);
        assert_eq!(settings.feedback.incorrect_display_ms, 2_000);
    }
}
