use std::sync::Arc;

use course_core::model::{Course, CourseId};
use storage::repository::CatalogRepository;

use crate::error::CatalogServiceError;

/// Publishes and reads catalog entries.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Validate `course` and store it, replacing any previous version.
    ///
    /// Existing enrollments are kept; their progress is measured against the
    /// new content from now on.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn publish_course(&self, course: &Course) -> Result<(), CatalogServiceError> {
        course.validate()?;
        self.catalog.upsert_course(course).await?;
        let outline = course.outline();
        tracing::info!(
            course = %course.id,
            lessons = outline.lessons.len(),
            quizzes = outline.quizzes.len(),
            "course published"
        );
        Ok(())
    }

    /// Fetch a course by ID.
    ///
    /// Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, id: CourseId) -> Result<Option<Course>, CatalogServiceError> {
        let course = self.catalog.get_course(id).await?;
        Ok(course)
    }

    /// List courses ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, CatalogServiceError> {
        let courses = self.catalog.list_courses(limit).await?;
        Ok(courses)
    }
}
