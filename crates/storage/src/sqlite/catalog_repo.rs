use std::collections::HashMap;

use course_core::model::{Course, CourseId, Lesson, Module, ModuleId, Question, Quiz, QuizId};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_from_i64, id_to_i64, lesson_id_from_i64, module_id_from_i64,
    parse_lesson_kind, parse_question_kind, quiz_id_from_i64, ser,
};
use crate::repository::{CatalogRepository, StorageError};

const CLEAR_COURSE_CONTENT: [&str; 4] = [
    "DELETE FROM quiz_questions WHERE course_id = ?1",
    "DELETE FROM quizzes WHERE course_id = ?1",
    "DELETE FROM lessons WHERE course_id = ?1",
    "DELETE FROM course_modules WHERE course_id = ?1",
];

fn position(v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("position overflow".into()))
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let course_id = id_to_i64("course_id", course.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(course_id)
        .bind(course.title.as_str())
        .bind(course.description.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        for statement in CLEAR_COURSE_CONTENT {
            sqlx::query(statement)
                .bind(course_id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        for (module_pos, module) in course.modules.iter().enumerate() {
            let module_id = id_to_i64("module_id", module.id.value())?;
            sqlx::query(
                "INSERT INTO course_modules (course_id, id, position, title) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(course_id)
            .bind(module_id)
            .bind(position(module_pos)?)
            .bind(module.title.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (pos, lesson) in module.lessons.iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO lessons (course_id, id, module_id, position, title, kind)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(course_id)
                .bind(id_to_i64("lesson_id", lesson.id.value())?)
                .bind(module_id)
                .bind(position(pos)?)
                .bind(lesson.title.as_str())
                .bind(lesson.kind.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }

            for (pos, quiz) in module.quizzes.iter().enumerate() {
                let quiz_id = id_to_i64("quiz_id", quiz.id.value())?;
                sqlx::query(
                    r"
                    INSERT INTO quizzes (course_id, id, module_id, position, title)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ",
                )
                .bind(course_id)
                .bind(quiz_id)
                .bind(module_id)
                .bind(position(pos)?)
                .bind(quiz.title.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

                for (q_pos, question) in quiz.questions.iter().enumerate() {
                    sqlx::query(
                        r"
                        INSERT INTO quiz_questions (course_id, quiz_id, position, text, kind, options, correct_answers)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        ",
                    )
                    .bind(course_id)
                    .bind(quiz_id)
                    .bind(position(q_pos)?)
                    .bind(question.text.as_str())
                    .bind(question.kind.as_str())
                    .bind(serde_json::to_string(&question.options).map_err(ser)?)
                    .bind(serde_json::to_string(&question.correct_answers).map_err(ser)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(course = %course.id, modules = course.modules.len(), "course stored");
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let course = load_course(&mut tx, id).await?;
        tx.commit().await.map_err(conn)?;
        Ok(course)
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let rows = sqlx::query("SELECT id FROM courses ORDER BY id ASC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            let id = course_id_from_i64(row.try_get("id").map_err(ser)?)?;
            if let Some(course) = load_course(&mut tx, id).await? {
                courses.push(course);
            }
        }
        tx.commit().await.map_err(conn)?;
        Ok(courses)
    }
}

async fn load_course(
    db: &mut SqliteConnection,
    id: CourseId,
) -> Result<Option<Course>, StorageError> {
    let course_id = id_to_i64("course_id", id.value())?;

    let Some(header) = sqlx::query("SELECT id, title, description FROM courses WHERE id = ?1")
        .bind(course_id)
        .fetch_optional(&mut *db)
        .await
        .map_err(conn)?
    else {
        return Ok(None);
    };

    let module_rows = sqlx::query(
        "SELECT id, title FROM course_modules WHERE course_id = ?1 ORDER BY position ASC",
    )
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    let lesson_rows = sqlx::query(
        "SELECT id, module_id, title, kind FROM lessons WHERE course_id = ?1 ORDER BY position ASC",
    )
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    let quiz_rows = sqlx::query(
        "SELECT id, module_id, title FROM quizzes WHERE course_id = ?1 ORDER BY position ASC",
    )
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    let question_rows = sqlx::query(
        r"
        SELECT quiz_id, text, kind, options, correct_answers
        FROM quiz_questions
        WHERE course_id = ?1
        ORDER BY quiz_id ASC, position ASC
        ",
    )
    .bind(course_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    let mut questions: HashMap<QuizId, Vec<Question>> = HashMap::new();
    for row in &question_rows {
        let options: String = row.try_get("options").map_err(ser)?;
        let correct: String = row.try_get("correct_answers").map_err(ser)?;
        let kind: String = row.try_get("kind").map_err(ser)?;
        questions
            .entry(quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?)
            .or_default()
            .push(Question {
                text: row.try_get("text").map_err(ser)?,
                kind: parse_question_kind(&kind)?,
                options: serde_json::from_str(&options).map_err(ser)?,
                correct_answers: serde_json::from_str(&correct).map_err(ser)?,
            });
    }

    let mut lessons: HashMap<ModuleId, Vec<Lesson>> = HashMap::new();
    for row in &lesson_rows {
        let kind: String = row.try_get("kind").map_err(ser)?;
        lessons
            .entry(module_id_from_i64(row.try_get("module_id").map_err(ser)?)?)
            .or_default()
            .push(Lesson {
                id: lesson_id_from_i64(row.try_get("id").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                kind: parse_lesson_kind(&kind)?,
            });
    }

    let mut quizzes: HashMap<ModuleId, Vec<Quiz>> = HashMap::new();
    for row in &quiz_rows {
        let quiz_id = quiz_id_from_i64(row.try_get("id").map_err(ser)?)?;
        quizzes
            .entry(module_id_from_i64(row.try_get("module_id").map_err(ser)?)?)
            .or_default()
            .push(Quiz {
                id: quiz_id,
                title: row.try_get("title").map_err(ser)?,
                questions: questions.remove(&quiz_id).unwrap_or_default(),
            });
    }

    let mut modules = Vec::with_capacity(module_rows.len());
    for row in &module_rows {
        let module_id = module_id_from_i64(row.try_get("id").map_err(ser)?)?;
        modules.push(Module {
            id: module_id,
            title: row.try_get("title").map_err(ser)?,
            lessons: lessons.remove(&module_id).unwrap_or_default(),
            quizzes: quizzes.remove(&module_id).unwrap_or_default(),
        });
    }

    Ok(Some(Course {
        id: course_id_from_i64(header.try_get("id").map_err(ser)?)?,
        title: header.try_get("title").map_err(ser)?,
        description: header.try_get("description").map_err(ser)?,
        modules,
    }))
}
