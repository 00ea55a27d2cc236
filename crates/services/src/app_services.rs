use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::enrollment::EnrollmentService;
use crate::error::AppServicesError;
use crate::notify::{NotificationSink, TracingNotifier};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    enrollments: Arc<EnrollmentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, Arc::new(TracingNotifier)))
    }

    /// Services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, Arc::new(TracingNotifier))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));
        let enrollments = Arc::new(
            EnrollmentService::new(
                clock,
                Arc::clone(&storage.catalog),
                Arc::clone(&storage.enrollments),
            )
            .with_notifier(notifier),
        );
        Self {
            catalog,
            enrollments,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }
}
