#![forbid(unsafe_code)]

pub mod app_services;
pub mod backend;
pub mod csv_import;
pub mod error;
pub mod notifier;
pub mod package_service;
pub mod question_service;
pub mod rest_backend;
pub mod sessions;
pub mod shuffle;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use backend::{QuizBackend, StorageBackend};
pub use csv_import::{CsvImportService, ImportReport, RowFailure};
pub use error::{
    AppServicesError, BackendError, ImportError, ImportRowError, PackageServiceError,
    QuestionServiceError, SessionError,
};
pub use notifier::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use package_service::PackageService;
pub use question_service::{QuestionService, QuestionWithOptions};
pub use rest_backend::{RestBackend, RestConfig};
pub use shuffle::ShuffleSource;

pub use sessions::{PlayerInput, SessionEvent, SessionOutcome, SessionRunner};
