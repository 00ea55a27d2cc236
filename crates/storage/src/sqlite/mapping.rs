use std::collections::{BTreeMap, BTreeSet};

use course_core::model::{
    CourseId, Enrollment, EnrollmentKey, LessonId, LessonKind, ModuleId, QuestionKind, QuizId,
    StudentId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

/// Bindable form of an enrollment key: `(student_id, course_id)`.
pub(crate) fn key_to_i64(key: EnrollmentKey) -> Result<(i64, i64), StorageError> {
    Ok((
        id_to_i64("student_id", key.student.value())?,
        id_to_i64("course_id", key.course.value())?,
    ))
}

pub(crate) fn parse_lesson_kind(s: &str) -> Result<LessonKind, StorageError> {
    match s {
        "video" => Ok(LessonKind::Video),
        "text" => Ok(LessonKind::Text),
        "document" => Ok(LessonKind::Document),
        _ => Err(StorageError::Serialization(format!("invalid lesson kind: {s}"))),
    }
}

pub(crate) fn parse_question_kind(s: &str) -> Result<QuestionKind, StorageError> {
    match s {
        "single-choice" => Ok(QuestionKind::SingleChoice),
        "multi-choice" => Ok(QuestionKind::MultiChoice),
        _ => Err(StorageError::Serialization(format!("invalid question kind: {s}"))),
    }
}

pub(crate) fn score_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid score: {v}")))
}

/// Assemble an enrollment from its header row plus the two child tables.
pub(crate) fn map_enrollment(
    header: &SqliteRow,
    lesson_rows: &[SqliteRow],
    quiz_rows: &[SqliteRow],
) -> Result<Enrollment, StorageError> {
    let key = EnrollmentKey::new(
        student_id_from_i64(header.try_get("student_id").map_err(ser)?)?,
        course_id_from_i64(header.try_get("course_id").map_err(ser)?)?,
    );

    let mut completed = BTreeSet::new();
    for row in lesson_rows {
        completed.insert(lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?);
    }

    let mut scores = BTreeMap::new();
    for row in quiz_rows {
        scores.insert(
            quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?,
            score_from_i64(row.try_get("score").map_err(ser)?)?,
        );
    }

    let last_visited = header
        .try_get::<Option<i64>, _>("last_visited_lesson_id")
        .map_err(ser)?
        .map(lesson_id_from_i64)
        .transpose()?;

    Enrollment::from_persisted(
        key,
        completed,
        scores,
        last_visited,
        header.try_get("enrolled_at").map_err(ser)?,
        header.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}
