mod service;
mod session;
mod view;

pub use crate::error::EnrollmentServiceError;
pub use service::EnrollmentService;
pub use session::StudentSession;
pub use view::{CourseProgressView, DashboardEntry, LessonCompletion, PendingQuiz, QuizSubmission};
