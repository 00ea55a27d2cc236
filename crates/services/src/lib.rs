#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod enrollment;
pub mod error;
pub mod notify;

pub use course_core::{Clock, evaluate_answer};

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use enrollment::{
    CourseProgressView, DashboardEntry, EnrollmentService, LessonCompletion, PendingQuiz,
    QuizSubmission, StudentSession,
};
pub use error::{AppServicesError, CatalogServiceError, EnrollmentServiceError, NotifyError};
pub use notify::{NoopNotifier, NotificationSink, ProgressEvent, TracingNotifier};
