//! Shared error types for the services crate.

use thiserror::Error;

use course_core::EvaluationError;
use course_core::model::{CatalogError, CourseId, LessonId, QuizId, StudentId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `EnrollmentService`.
///
/// The `*NotFound` / `*NotInCourse` variants mean a reference did not resolve
/// against the catalog or the store; they are data-integrity problems, not
/// transient faults.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course {0} does not exist")]
    CourseNotFound(CourseId),

    #[error("student {student} is not enrolled in course {course}")]
    EnrollmentNotFound { student: StudentId, course: CourseId },

    #[error("lesson {lesson} does not belong to course {course}")]
    LessonNotInCourse { lesson: LessonId, course: CourseId },

    #[error("quiz {quiz} does not belong to course {course}")]
    QuizNotInCourse { quiz: QuizId, course: CourseId },

    #[error("student {student} is already enrolled in course {course}")]
    AlreadyEnrolled { student: StudentId, course: CourseId },

    #[error("score {score} is outside 0..={max} for quiz {quiz}")]
    InvalidScore { quiz: QuizId, score: i64, max: usize },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EnrollmentServiceError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CourseNotFound(_)
                | Self::EnrollmentNotFound { .. }
                | Self::LessonNotInCourse { .. }
                | Self::QuizNotInCourse { .. }
        )
    }

    /// Malformed input, rejected before any mutation.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidScore { .. } | Self::Evaluation(_))
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by a `NotificationSink`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
