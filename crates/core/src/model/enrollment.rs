use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, QuizId, StudentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("updated_at is before enrolled_at")]
    InvalidTimeRange,

    #[error("last visited lesson {0} is not a completed lesson")]
    UnknownLastLesson(LessonId),
}

//
// ─── KEY ───────────────────────────────────────────────────────────────────────
//

/// An enrollment exists at most once per (student, course) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnrollmentKey {
    pub student: StudentId,
    pub course: CourseId,
}

impl EnrollmentKey {
    #[must_use]
    pub fn new(student: StudentId, course: CourseId) -> Self {
        Self { student, course }
    }
}

impl fmt::Display for EnrollmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "student {} in course {}", self.student, self.course)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Per-student, per-course progress record.
///
/// Completion sets only ever grow. The progress percentage is not stored here;
/// see [`crate::progress::compute_progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    key: EnrollmentKey,
    completed_lessons: BTreeSet<LessonId>,
    completed_quizzes: BTreeSet<QuizId>,
    quiz_scores: BTreeMap<QuizId, u32>,
    last_visited_lesson: Option<LessonId>,
    enrolled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh, empty enrollment.
    #[must_use]
    pub fn new(key: EnrollmentKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            completed_lessons: BTreeSet::new(),
            completed_quizzes: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            last_visited_lesson: None,
            enrolled_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate an enrollment from storage.
    ///
    /// The completed-quiz set is rebuilt from the score map so the two can
    /// never drift apart.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTimeRange` if `updated_at < enrolled_at`.
    /// Returns `EnrollmentError::UnknownLastLesson` if the last visited lesson was never completed.
    pub fn from_persisted(
        key: EnrollmentKey,
        completed_lessons: BTreeSet<LessonId>,
        quiz_scores: BTreeMap<QuizId, u32>,
        last_visited_lesson: Option<LessonId>,
        enrolled_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        if updated_at < enrolled_at {
            return Err(EnrollmentError::InvalidTimeRange);
        }
        if let Some(last) = last_visited_lesson {
            if !completed_lessons.contains(&last) {
                return Err(EnrollmentError::UnknownLastLesson(last));
            }
        }
        Ok(Self {
            key,
            completed_lessons,
            completed_quizzes: quiz_scores.keys().copied().collect(),
            quiz_scores,
            last_visited_lesson,
            enrolled_at,
            updated_at,
        })
    }

    /// Mark a lesson complete. Returns `true` when the lesson was not yet in the set.
    ///
    /// `last_visited_lesson` moves to `lesson` on every call, repeats included.
    pub fn record_lesson(&mut self, lesson: LessonId, at: DateTime<Utc>) -> bool {
        let inserted = self.completed_lessons.insert(lesson);
        self.last_visited_lesson = Some(lesson);
        self.touch(at);
        inserted
    }

    /// Record a quiz result, overwriting any earlier score for the same quiz.
    ///
    /// Returns the previous score, if any.
    pub fn record_quiz(&mut self, quiz: QuizId, score: u32, at: DateTime<Utc>) -> Option<u32> {
        self.completed_quizzes.insert(quiz);
        let previous = self.quiz_scores.insert(quiz, score);
        self.touch(at);
        previous
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }

    #[must_use]
    pub fn key(&self) -> EnrollmentKey {
        self.key
    }

    #[must_use]
    pub fn student(&self) -> StudentId {
        self.key.student
    }

    #[must_use]
    pub fn course(&self) -> CourseId {
        self.key.course
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn completed_quizzes(&self) -> &BTreeSet<QuizId> {
        &self.completed_quizzes
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<QuizId, u32> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn quiz_score(&self, quiz: QuizId) -> Option<u32> {
        self.quiz_scores.get(&quiz).copied()
    }

    #[must_use]
    pub fn last_visited_lesson(&self) -> Option<LessonId> {
        self.last_visited_lesson
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn key() -> EnrollmentKey {
        EnrollmentKey::new(StudentId::new(1), CourseId::new(2))
    }

    #[test]
    fn new_enrollment_is_empty() {
        let enrollment = Enrollment::new(key(), fixed_now());
        assert!(enrollment.completed_lessons().is_empty());
        assert!(enrollment.completed_quizzes().is_empty());
        assert_eq!(enrollment.last_visited_lesson(), None);
    }

    #[test]
    fn repeat_lesson_is_idempotent_but_moves_last_visited() {
        let now = fixed_now();
        let mut enrollment = Enrollment::new(key(), now);

        assert!(enrollment.record_lesson(LessonId::new(1), now));
        assert!(enrollment.record_lesson(LessonId::new(2), now));
        assert!(!enrollment.record_lesson(LessonId::new(1), now));

        assert_eq!(enrollment.completed_lessons().len(), 2);
        assert_eq!(enrollment.last_visited_lesson(), Some(LessonId::new(1)));
    }

    #[test]
    fn quiz_score_overwrites() {
        let now = fixed_now();
        let mut enrollment = Enrollment::new(key(), now);

        assert_eq!(enrollment.record_quiz(QuizId::new(5), 3, now), None);
        assert_eq!(enrollment.record_quiz(QuizId::new(5), 5, now), Some(3));

        assert_eq!(enrollment.quiz_score(QuizId::new(5)), Some(5));
        assert_eq!(enrollment.completed_quizzes().len(), 1);
        assert_eq!(enrollment.quiz_scores().len(), 1);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let now = fixed_now();
        let mut enrollment = Enrollment::new(key(), now);
        enrollment.record_lesson(LessonId::new(1), now - chrono::Duration::hours(1));
        assert_eq!(enrollment.updated_at(), now);
    }

    #[test]
    fn from_persisted_rejects_orphan_last_lesson() {
        let now = fixed_now();
        let err = Enrollment::from_persisted(
            key(),
            BTreeSet::new(),
            BTreeMap::new(),
            Some(LessonId::new(4)),
            now,
            now,
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::UnknownLastLesson(LessonId::new(4)));
    }

    #[test]
    fn from_persisted_derives_quiz_set_from_scores() {
        let now = fixed_now();
        let scores = BTreeMap::from([(QuizId::new(1), 2), (QuizId::new(3), 0)]);
        let enrollment =
            Enrollment::from_persisted(key(), BTreeSet::new(), scores, None, now, now).unwrap();
        assert_eq!(
            enrollment.completed_quizzes().iter().copied().collect::<Vec<_>>(),
            vec![QuizId::new(1), QuizId::new(3)]
        );
    }
}
