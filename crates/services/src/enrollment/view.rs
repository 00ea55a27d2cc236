use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use course_core::model::{Course, CourseId, Enrollment, LessonId, ModuleId, QuizId};
use course_core::{Progress, ProgressBand};

/// Outcome of a lesson completion.
///
/// `completed_lessons` is the stored set, including ids the catalog may have
/// dropped since; `progress` only counts current content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonCompletion {
    pub completed_lessons: BTreeSet<LessonId>,
    pub progress: Progress,
    pub last_visited_lesson: Option<LessonId>,
}

impl LessonCompletion {
    pub(crate) fn new(enrollment: &Enrollment, progress: Progress) -> Self {
        Self {
            completed_lessons: enrollment.completed_lessons().clone(),
            progress,
            last_visited_lesson: enrollment.last_visited_lesson(),
        }
    }
}

/// Outcome of a quiz submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSubmission {
    pub quiz: QuizId,
    pub score: u32,
    pub completed_quizzes: BTreeSet<QuizId>,
    pub quiz_scores: BTreeMap<QuizId, u32>,
    pub progress: Progress,
}

impl QuizSubmission {
    pub(crate) fn new(enrollment: &Enrollment, quiz: QuizId, score: u32, progress: Progress) -> Self {
        Self {
            quiz,
            score,
            completed_quizzes: enrollment.completed_quizzes().clone(),
            quiz_scores: enrollment.quiz_scores().clone(),
            progress,
        }
    }
}

/// A quiz of the course the student has not submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingQuiz {
    pub module: ModuleId,
    pub quiz: QuizId,
    pub title: String,
}

/// Course page state for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgressView {
    pub course: CourseId,
    pub title: String,
    pub progress: Progress,
    pub completed_lessons: BTreeSet<LessonId>,
    pub quiz_scores: BTreeMap<QuizId, u32>,
    pub last_visited_lesson: Option<LessonId>,
    /// Module order, then quiz order within the module.
    pub pending_quizzes: Vec<PendingQuiz>,
    pub certificate_available: bool,
}

impl CourseProgressView {
    pub(crate) fn build(course: &Course, enrollment: &Enrollment, progress: Progress) -> Self {
        let outline = course.outline();
        let completed_lessons = enrollment
            .completed_lessons()
            .iter()
            .copied()
            .filter(|id| outline.contains_lesson(*id))
            .collect();
        let quiz_scores = enrollment
            .quiz_scores()
            .iter()
            .filter(|(id, _)| outline.quizzes.contains_key(*id))
            .map(|(id, score)| (*id, *score))
            .collect();

        let pending_quizzes = course
            .modules
            .iter()
            .flat_map(|module| {
                module
                    .quizzes
                    .iter()
                    .filter(|quiz| !enrollment.completed_quizzes().contains(&quiz.id))
                    .map(|quiz| PendingQuiz {
                        module: module.id,
                        quiz: quiz.id,
                        title: quiz.title.clone(),
                    })
            })
            .collect();

        Self {
            course: course.id,
            title: course.title.clone(),
            progress,
            completed_lessons,
            quiz_scores,
            last_visited_lesson: enrollment.last_visited_lesson(),
            pending_quizzes,
            certificate_available: progress.is_complete(),
        }
    }
}

/// One row of the student dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub course: CourseId,
    pub title: String,
    pub progress: Progress,
    pub band: ProgressBand,
    pub certificate_available: bool,
}

impl DashboardEntry {
    pub(crate) fn new(course: &Course, progress: Progress) -> Self {
        Self {
            course: course.id,
            title: course.title.clone(),
            progress,
            band: progress.band(),
            certificate_available: progress.is_complete(),
        }
    }
}
