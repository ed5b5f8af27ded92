use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::backend::{QuizBackend, StorageBackend};
use crate::csv_import::CsvImportService;
use crate::error::AppServicesError;
use crate::package_service::PackageService;
use crate::question_service::QuestionService;
use crate::rest_backend::{RestBackend, RestConfig};

/// Assembles app-facing services over one storage handle.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    packages: Arc<PackageService>,
    questions: Arc<QuestionService>,
    import: Arc<CsvImportService>,
    backend: Arc<dyn QuizBackend>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Sessions read through `rest` when given, otherwise through the local
    /// database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        rest: Option<RestConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, rest))
    }

    /// Like `new_sqlite`, with the backend chosen from `QUIZ_API_URL`/`QUIZ_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn from_env(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        Self::new_sqlite(db_url, clock, RestConfig::from_env()).await
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, rest: Option<RestConfig>) -> Self {
        let packages = Arc::new(PackageService::new(
            clock,
            Arc::clone(&storage.packages),
            Arc::clone(&storage.assignments),
        ));
        let questions = QuestionService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.wrong_answers),
        );
        let import = Arc::new(CsvImportService::new(questions.clone()));

        let backend: Arc<dyn QuizBackend> = match rest {
            Some(config) => {
                info!(base_url = %config.base_url, "sessions use the REST backend");
                Arc::new(RestBackend::new(config))
            }
            None => Arc::new(StorageBackend::new(&storage)),
        };

        Self {
            storage,
            packages,
            questions: Arc::new(questions),
            import,
            backend,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn packages(&self) -> Arc<PackageService> {
        Arc::clone(&self.packages)
    }

    #[must_use]
    pub fn questions(&self) -> Arc<QuestionService> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn import(&self) -> Arc<CsvImportService> {
        Arc::clone(&self.import)
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn QuizBackend> {
        Arc::clone(&self.backend)
    }
}
