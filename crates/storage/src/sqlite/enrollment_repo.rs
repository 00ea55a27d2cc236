use chrono::{DateTime, Utc};
use course_core::model::{Enrollment, EnrollmentKey, LessonId, QuizId, StudentId};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{conn, course_id_from_i64, id_to_i64, key_to_i64, map_enrollment, ser};
use crate::repository::{EnrollmentRepository, Recorded, StorageError};

async fn load_enrollment(
    db: &mut SqliteConnection,
    key: EnrollmentKey,
) -> Result<Option<Enrollment>, StorageError> {
    let (student_id, course_id) = key_to_i64(key)?;

    let Some(header) = sqlx::query(
        r"
        SELECT student_id, course_id, last_visited_lesson_id, enrolled_at, updated_at
        FROM enrollments
        WHERE student_id = ?1 AND course_id = ?2
        ",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(&mut *db)
    .await
    .map_err(conn)?
    else {
        return Ok(None);
    };

    let lessons = sqlx::query(
        "SELECT lesson_id FROM enrollment_lessons WHERE student_id = ?1 AND course_id = ?2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    let quizzes = sqlx::query(
        "SELECT quiz_id, score FROM enrollment_quizzes WHERE student_id = ?1 AND course_id = ?2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    map_enrollment(&header, &lessons, &quizzes).map(Some)
}

/// Bumps the enrollment header and reports whether the row exists.
///
/// Runs as the first statement of a write transaction so `SQLite` takes the
/// write lock up front and the busy timeout applies.
async fn touch_enrollment(
    db: &mut SqliteConnection,
    key: EnrollmentKey,
    last_visited: Option<LessonId>,
    at: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let (student_id, course_id) = key_to_i64(key)?;
    let last_visited = last_visited
        .map(|id| id_to_i64("lesson_id", id.value()))
        .transpose()?;

    let res = sqlx::query(
        r"
        UPDATE enrollments SET
            last_visited_lesson_id = COALESCE(?3, last_visited_lesson_id),
            updated_at = MAX(updated_at, ?4)
        WHERE student_id = ?1 AND course_id = ?2
        ",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(last_visited)
    .bind(at)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    Ok(res.rows_affected() > 0)
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let (student_id, course_id) = key_to_i64(enrollment.key())?;
        let last_visited = enrollment
            .last_visited_lesson()
            .map(|id| id_to_i64("lesson_id", id.value()))
            .transpose()?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let res = sqlx::query(
            r"
            INSERT INTO enrollments (student_id, course_id, last_visited_lesson_id, enrolled_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(student_id, course_id) DO NOTHING
            ",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(last_visited)
        .bind(enrollment.enrolled_at())
        .bind(enrollment.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        for lesson in enrollment.completed_lessons() {
            sqlx::query(
                r"
                INSERT INTO enrollment_lessons (student_id, course_id, lesson_id, completed_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(student_id)
            .bind(course_id)
            .bind(id_to_i64("lesson_id", lesson.value())?)
            .bind(enrollment.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        for (quiz, score) in enrollment.quiz_scores() {
            sqlx::query(
                r"
                INSERT INTO enrollment_quizzes (student_id, course_id, quiz_id, score, submitted_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(student_id)
            .bind(course_id)
            .bind(id_to_i64("quiz_id", quiz.value())?)
            .bind(i64::from(*score))
            .bind(enrollment.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_enrollment(&self, key: EnrollmentKey) -> Result<Option<Enrollment>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let enrollment = load_enrollment(&mut tx, key).await?;
        tx.commit().await.map_err(conn)?;
        Ok(enrollment)
    }

    async fn list_enrollments(&self, student: StudentId) -> Result<Vec<Enrollment>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let rows = sqlx::query(
            "SELECT course_id FROM enrollments WHERE student_id = ?1 ORDER BY course_id ASC",
        )
        .bind(id_to_i64("student_id", student.value())?)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in rows {
            let course = course_id_from_i64(row.try_get("course_id").map_err(ser)?)?;
            if let Some(e) = load_enrollment(&mut tx, EnrollmentKey::new(student, course)).await? {
                enrollments.push(e);
            }
        }
        tx.commit().await.map_err(conn)?;
        Ok(enrollments)
    }

    async fn record_lesson_completion(
        &self,
        key: EnrollmentKey,
        lesson: LessonId,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        if !touch_enrollment(&mut tx, key, Some(lesson), at).await? {
            return Err(StorageError::NotFound);
        }

        let (student_id, course_id) = key_to_i64(key)?;
        let res = sqlx::query(
            r"
            INSERT INTO enrollment_lessons (student_id, course_id, lesson_id, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id, course_id, lesson_id) DO NOTHING
            ",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(id_to_i64("lesson_id", lesson.value())?)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let enrollment = load_enrollment(&mut tx, key)
            .await?
            .ok_or(StorageError::NotFound)?;
        tx.commit().await.map_err(conn)?;

        let inserted = res.rows_affected() > 0;
        tracing::debug!(%key, %lesson, inserted, "lesson completion stored");
        Ok(Recorded {
            enrollment,
            inserted,
        })
    }

    async fn record_quiz_submission(
        &self,
        key: EnrollmentKey,
        quiz: QuizId,
        score: u32,
        at: DateTime<Utc>,
    ) -> Result<Recorded, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        if !touch_enrollment(&mut tx, key, None, at).await? {
            return Err(StorageError::NotFound);
        }

        let (student_id, course_id) = key_to_i64(key)?;
        let quiz_id = id_to_i64("quiz_id", quiz.value())?;
        let existing = sqlx::query(
            "SELECT 1 FROM enrollment_quizzes WHERE student_id = ?1 AND course_id = ?2 AND quiz_id = ?3",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(quiz_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO enrollment_quizzes (student_id, course_id, quiz_id, score, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(student_id, course_id, quiz_id) DO UPDATE SET
                score = excluded.score,
                submitted_at = excluded.submitted_at
            ",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(quiz_id)
        .bind(i64::from(score))
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let enrollment = load_enrollment(&mut tx, key)
            .await?
            .ok_or(StorageError::NotFound)?;
        tx.commit().await.map_err(conn)?;

        let inserted = existing.is_none();
        tracing::debug!(%key, %quiz, score, inserted, "quiz submission stored");
        Ok(Recorded {
            enrollment,
            inserted,
        })
    }
}
