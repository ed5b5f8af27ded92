mod answer;
mod ids;
mod package;
mod question;
mod session;

pub use ids::{AnswerId, GuardianId, KidId, PackageId, ParseIdError, QuestionId};

pub use answer::{
    AnswerDraft, AnswerOption, AnswerSetError, MIN_ANSWER_OPTIONS, ValidatedAnswers,
    correct_option,
};
pub use package::{Package, PackageError, PackageOrder, PresentationOrder};
pub use question::{
    DEFAULT_POINTS, DEFAULT_TIME_LIMIT_SECS, POINTS_RANGE, Question, QuestionDraft, QuestionError,
    TIME_LIMIT_RANGE, ValidatedQuestion,
};
pub use session::{KidAnswer, SessionSummary, SessionSummaryError, WrongAnswer};
