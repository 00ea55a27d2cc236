mod catalog;
mod enrollment;
mod ids;

pub use catalog::{
    CatalogError, Course, CourseOutline, Lesson, LessonKind, Module, Question, QuestionKind, Quiz,
};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentKey};
pub use ids::{CourseId, LessonId, ModuleId, ParseIdError, QuizId, StudentId};
