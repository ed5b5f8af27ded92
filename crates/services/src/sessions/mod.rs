mod effects;
mod loader;
mod machine;
mod option_cache;
mod recorder;
mod request;
mod runtime;
mod view;

#[cfg(test)]
pub(crate) mod test_support;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use effects::{Feedback, FeedbackKind};
pub use loader::{QuestionLoader, arrange};
pub use machine::{
    CloseReason, OptionMark, PendingTransition, Resolution, SessionMachine, SessionPhase,
    TransitionOutcome, TransitionStart, TransitionToken,
};
pub use option_cache::{DEFAULT_PREFETCH_AHEAD, OptionCache, OptionLoad};
pub use recorder::{AnswerRecorder, Recorded};
pub use request::{DEFAULT_REQUEST_TIMEOUT, RequestController, RequestError, RequestScope};
pub use runtime::{PlayerInput, SessionEvent, SessionOutcome, SessionRunner};
pub use view::{FeedbackView, OptionView, QuestionView};
