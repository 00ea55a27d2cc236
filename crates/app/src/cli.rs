use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use course_core::model::{CourseId, LessonId, QuizId, StudentId};

#[derive(Parser, Debug)]
#[command(name = "coursetrack", version, about = "Course enrollment progress tracker", long_about = None)]
pub struct Cli {
    /// SQLite database URL or path
    #[arg(
        long = "db",
        global = true,
        env = "COURSETRACK_DB_URL",
        default_value = "sqlite://coursetrack.sqlite3"
    )]
    pub db_url: String,

    /// Log filter, e.g. `info` or `services=debug`; `RUST_LOG` wins when set
    #[arg(long, global = true, env = "COURSETRACK_LOG")]
    pub log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and publish a course from a JSON file
    Import { path: PathBuf },
    /// List published courses
    Courses {
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Enroll a student in a course
    Enroll(CourseArgs),
    /// Mark a lesson as completed
    CompleteLesson {
        #[command(flatten)]
        target: CourseArgs,
        #[arg(long)]
        lesson: LessonId,
    },
    /// Record a quiz score reported by the client
    SubmitQuiz {
        #[command(flatten)]
        target: CourseArgs,
        #[arg(long)]
        quiz: QuizId,
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },
    /// Grade quiz answers and record the score
    ///
    /// Each `--answer` covers one question in order; separate multiple
    /// options with commas.
    SubmitAnswers {
        #[command(flatten)]
        target: CourseArgs,
        #[arg(long)]
        quiz: QuizId,
        #[arg(long = "answer")]
        answers: Vec<String>,
    },
    /// Show course progress for a student
    Progress(CourseArgs),
    /// Check certificate eligibility
    Certificate(CourseArgs),
    /// Show all enrollments of a student
    Dashboard {
        #[arg(long)]
        student: StudentId,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct CourseArgs {
    #[arg(long)]
    pub student: StudentId,
    #[arg(long)]
    pub course: CourseId,
}

/// Split a comma separated `--answer` value into options.
///
/// An empty value is an unanswered question.
pub fn split_answer(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(str::to_owned)
        .collect()
}
