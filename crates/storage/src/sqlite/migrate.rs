use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_modules (
            course_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            title TEXT NOT NULL,
            PRIMARY KEY (course_id, id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            course_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            PRIMARY KEY (course_id, id),
            FOREIGN KEY (course_id, module_id) REFERENCES course_modules(course_id, id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            course_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            title TEXT NOT NULL,
            PRIMARY KEY (course_id, id),
            FOREIGN KEY (course_id, module_id) REFERENCES course_modules(course_id, id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            course_id INTEGER NOT NULL,
            quiz_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_answers TEXT NOT NULL,
            PRIMARY KEY (course_id, quiz_id, position),
            FOREIGN KEY (course_id, quiz_id) REFERENCES quizzes(course_id, id) ON DELETE CASCADE
        );
    ",
    // No foreign key to the catalog: content may change after progress exists.
    r"
        CREATE TABLE IF NOT EXISTS enrollments (
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            last_visited_lesson_id INTEGER,
            enrolled_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (student_id, course_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS enrollment_lessons (
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            lesson_id INTEGER NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (student_id, course_id, lesson_id),
            FOREIGN KEY (student_id, course_id) REFERENCES enrollments(student_id, course_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS enrollment_quizzes (
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            quiz_id INTEGER NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            submitted_at TEXT NOT NULL,
            PRIMARY KEY (student_id, course_id, quiz_id),
            FOREIGN KEY (student_id, course_id) REFERENCES enrollments(student_id, course_id) ON DELETE CASCADE
        );
    ",
];

/// Applies every schema version that has not been recorded yet.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;
        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
