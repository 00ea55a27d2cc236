use course_core::model::{CourseId, EnrollmentKey, StudentId};

/// The authenticated student on whose behalf a transition runs.
///
/// Callers resolve identity at the edge and pass it in explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentSession {
    student: StudentId,
}

impl StudentSession {
    #[must_use]
    pub fn new(student: StudentId) -> Self {
        Self { student }
    }

    #[must_use]
    pub fn student(&self) -> StudentId {
        self.student
    }

    #[must_use]
    pub fn key(&self, course: CourseId) -> EnrollmentKey {
        EnrollmentKey::new(self.student, course)
    }
}
