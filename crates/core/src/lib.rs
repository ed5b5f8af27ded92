#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod settings;
pub mod time;

pub use error::Error;
pub use settings::{FeedbackTimings, SessionSettings, SettingsError};
pub use time::Clock;
