use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, Enrollment, EnrollmentKey, LessonId, QuizId, StudentId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of an atomic completion write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// The enrollment as stored after the write.
    pub enrollment: Enrollment,
    /// `true` when the lesson or quiz was not yet in the completed set.
    pub inserted: bool,
}

/// Read/write access to the content catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or replace a course together with its modules, lessons and quizzes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails; a missing course is `Ok(None)`.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by ID, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;
}

/// Persistence contract for enrollments.
///
/// The two `record_*` methods are atomic: the set insert happens inside the
/// store, so concurrent writers on the same key never drop each other's
/// completions.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Store a new enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if one already exists for the key.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails; a missing enrollment is `Ok(None)`.
    async fn get_enrollment(&self, key: EnrollmentKey) -> Result<Option<Enrollment>, StorageError>;

    /// All enrollments of a student, ordered by course ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn list_enrollments(&self, student: StudentId) -> Result<Vec<Enrollment>, StorageError>;

    /// Add `lesson` to the completed set and make it the last visited lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn record_lesson_completion(
        &self,
        key: EnrollmentKey,
        lesson: LessonId,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError>;

    /// Add `quiz` to the completed set and overwrite its score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn record_quiz_submission(
        &self,
        key: EnrollmentKey,
        quiz: QuizId,
        score: u32,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Every mutation runs while holding the map lock, which serialises writers.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<BTreeMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<EnrollmentKey, Enrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update_enrollment<F>(&self, key: EnrollmentKey, apply: F) -> Result<Recorded, StorageError>
    where
        F: FnOnce(&mut Enrollment) -> bool,
    {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let enrollment = guard.get_mut(&key).ok_or(StorageError::NotFound)?;
        let inserted = apply(enrollment);
        Ok(Recorded {
            enrollment: enrollment.clone(),
            inserted,
        })
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id, course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.values().take(limit).cloned().collect())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&enrollment.key()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(enrollment.key(), enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(&self, key: EnrollmentKey) -> Result<Option<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    async fn list_enrollments(&self, student: StudentId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Enrollment> = guard
            .values()
            .filter(|e| e.student() == student)
            .cloned()
            .collect();
        found.sort_by_key(Enrollment::course);
        Ok(found)
    }

    async fn record_lesson_completion(
        &self,
        key: EnrollmentKey,
        lesson: LessonId,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError> {
        self.update_enrollment(key, |e| e.record_lesson(lesson, at))
    }

    async fn record_quiz_submission(
        &self,
        key: EnrollmentKey,
        quiz: QuizId,
        score: u32,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError> {
        self.update_enrollment(key, |e| e.record_quiz(quiz, score, at).is_none())
    }
}

/// Aggregates catalog and enrollment repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            catalog,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_now;

    fn key() -> EnrollmentKey {
        EnrollmentKey::new(StudentId::new(7), CourseId::new(1))
    }

    #[tokio::test]
    async fn insert_twice_conflicts() {
        let repo = InMemoryRepository::new();
        let enrollment = Enrollment::new(key(), fixed_now());
        repo.insert_enrollment(&enrollment).await.unwrap();

        let err = repo.insert_enrollment(&enrollment).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn record_on_missing_enrollment_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .record_lesson_completion(key(), LessonId::new(1), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn records_lessons_and_quizzes() {
        let repo = InMemoryRepository::new();
        repo.insert_enrollment(&Enrollment::new(key(), fixed_now()))
            .await
            .unwrap();

        let first = repo
            .record_lesson_completion(key(), LessonId::new(3), fixed_now())
            .await
            .unwrap();
        assert!(first.inserted);
        let repeat = repo
            .record_lesson_completion(key(), LessonId::new(3), fixed_now())
            .await
            .unwrap();
        assert!(!repeat.inserted);

        let updated = repo
            .record_quiz_submission(key(), QuizId::new(4), 2, fixed_now())
            .await
            .unwrap()
            .enrollment;

        assert!(updated.completed_lessons().contains(&LessonId::new(3)));
        assert_eq!(updated.quiz_score(QuizId::new(4)), Some(2));

        let stored = repo.get_enrollment(key()).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn lists_only_the_students_enrollments() {
        let repo = InMemoryRepository::new();
        for (student, course) in [(7, 3), (7, 1), (8, 2)] {
            let key = EnrollmentKey::new(StudentId::new(student), CourseId::new(course));
            repo.insert_enrollment(&Enrollment::new(key, fixed_now()))
                .await
                .unwrap();
        }

        let listed = repo.list_enrollments(StudentId::new(7)).await.unwrap();
        let courses: Vec<_> = listed.iter().map(Enrollment::course).collect();
        assert_eq!(courses, vec![CourseId::new(1), CourseId::new(3)]);
    }
}
