#![forbid(unsafe_code)]

mod cli;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use course_core::model::Course;
use services::{AppServices, Clock, StudentSession};

use crate::cli::{Cli, Command, CourseArgs, split_answer};
use crate::output::{Certificate, CourseSummary, Enrolled, Output};

async fn run(cli: Cli) -> Result<()> {
    let db_url = config::normalize_sqlite_url(&cli.db_url);
    config::prepare_sqlite_dir(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default())
        .await
        .with_context(|| format!("opening database {db_url}"))?;
    tracing::debug!(db = %db_url, "storage ready");

    let out = Output::new(cli.json);
    let enrollments = app.enrollments();

    match cli.command {
        Command::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let course: Course = serde_json::from_str(&raw)
                .with_context(|| format!("parsing course file {}", path.display()))?;
            app.catalog().publish_course(&course).await?;
            out.published(&CourseSummary::new(&course))
        }
        Command::Courses { limit } => {
            let courses = app.catalog().list_courses(limit).await?;
            let summaries: Vec<_> = courses.iter().map(CourseSummary::new).collect();
            out.courses(&summaries)
        }
        Command::Enroll(CourseArgs { student, course }) => {
            let enrollment = enrollments
                .enroll(&StudentSession::new(student), course)
                .await?;
            out.enrolled(&Enrolled::new(&enrollment))
        }
        Command::CompleteLesson { target, lesson } => {
            let completion = enrollments
                .complete_lesson(&StudentSession::new(target.student), target.course, lesson)
                .await?;
            out.lesson(&completion)
        }
        Command::SubmitQuiz {
            target,
            quiz,
            score,
        } => {
            let submission = enrollments
                .submit_quiz(&StudentSession::new(target.student), target.course, quiz, score)
                .await?;
            out.quiz(&submission)
        }
        Command::SubmitAnswers {
            target,
            quiz,
            answers,
        } => {
            let responses: Vec<Vec<String>> = answers.iter().map(|a| split_answer(a)).collect();
            let submission = enrollments
                .submit_quiz_answers(
                    &StudentSession::new(target.student),
                    target.course,
                    quiz,
                    &responses,
                )
                .await?;
            out.quiz(&submission)
        }
        Command::Progress(CourseArgs { student, course }) => {
            let view = enrollments
                .course_progress(&StudentSession::new(student), course)
                .await?;
            out.progress(&view)
        }
        Command::Certificate(CourseArgs { student, course }) => {
            let eligible = enrollments
                .is_certificate_eligible(&StudentSession::new(student), course)
                .await?;
            out.certificate(&Certificate {
                student,
                course,
                eligible,
            })
        }
        Command::Dashboard { student } => {
            let entries = enrollments.dashboard(&StudentSession::new(student)).await?;
            out.dashboard(&entries)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    config::init_tracing(cli.log_level.as_deref());

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
