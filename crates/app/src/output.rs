use std::fmt::Write as _;

use anyhow::Result;
use course_core::Progress;
use course_core::model::{Course, CourseId, Enrollment, StudentId};
use serde::Serialize;
use services::{CourseProgressView, DashboardEntry, LessonCompletion, QuizSubmission};

/// Renders command results either as text or as pretty JSON on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

#[derive(Serialize)]
pub struct CourseSummary<'a> {
    pub id: CourseId,
    pub title: &'a str,
    pub modules: usize,
    pub lessons: usize,
    pub quizzes: usize,
}

impl<'a> CourseSummary<'a> {
    pub fn new(course: &'a Course) -> Self {
        let counts = course.outline().counts();
        Self {
            id: course.id,
            title: &course.title,
            modules: course.modules.len(),
            lessons: counts.lessons,
            quizzes: counts.quizzes,
        }
    }
}

#[derive(Serialize)]
pub struct Enrolled {
    pub student: StudentId,
    pub course: CourseId,
    pub enrolled_at: String,
}

impl Enrolled {
    pub fn new(enrollment: &Enrollment) -> Self {
        Self {
            student: enrollment.student(),
            course: enrollment.course(),
            enrolled_at: enrollment.enrolled_at().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct Certificate {
    pub student: StudentId,
    pub course: CourseId,
    pub eligible: bool,
}

fn percent(progress: Progress) -> String {
    format!("{:.2}%", progress.rounded(2))
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }

    pub fn courses(&self, courses: &[CourseSummary<'_>]) -> Result<()> {
        self.emit(&courses, |courses| {
            if courses.is_empty() {
                return "no courses published".to_string();
            }
            courses
                .iter()
                .map(|c| {
                    format!(
                        "{}\t{}\t{} modules, {} lessons, {} quizzes",
                        c.id, c.title, c.modules, c.lessons, c.quizzes
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    pub fn published(&self, summary: &CourseSummary<'_>) -> Result<()> {
        self.emit(summary, |c| {
            format!(
                "published course {} \"{}\" ({} lessons, {} quizzes)",
                c.id, c.title, c.lessons, c.quizzes
            )
        })
    }

    pub fn enrolled(&self, enrolled: &Enrolled) -> Result<()> {
        self.emit(enrolled, |e| {
            format!("student {} enrolled in course {}", e.student, e.course)
        })
    }

    pub fn lesson(&self, completion: &LessonCompletion) -> Result<()> {
        self.emit(completion, |c| {
            format!(
                "{} lessons completed, progress {}",
                c.completed_lessons.len(),
                percent(c.progress)
            )
        })
    }

    pub fn quiz(&self, submission: &QuizSubmission) -> Result<()> {
        self.emit(submission, |s| {
            format!(
                "quiz {} scored {}, progress {}",
                s.quiz,
                s.score,
                percent(s.progress)
            )
        })
    }

    pub fn progress(&self, view: &CourseProgressView) -> Result<()> {
        self.emit(view, |v| {
            let mut out = format!("{} (course {})\nprogress: {}", v.title, v.course, percent(v.progress));
            let _ = write!(out, "\nlessons completed: {}", v.completed_lessons.len());
            if let Some(lesson) = v.last_visited_lesson {
                let _ = write!(out, "\nlast lesson: {lesson}");
            }
            for (quiz, score) in &v.quiz_scores {
                let _ = write!(out, "\nquiz {quiz}: {score}");
            }
            for pending in &v.pending_quizzes {
                let _ = write!(
                    out,
                    "\npending quiz {} \"{}\" in module {}",
                    pending.quiz, pending.title, pending.module
                );
            }
            if v.certificate_available {
                out.push_str("\ncertificate available");
            }
            out
        })
    }

    pub fn certificate(&self, certificate: &Certificate) -> Result<()> {
        self.emit(certificate, |c| {
            if c.eligible {
                format!("student {} earned the certificate for course {}", c.student, c.course)
            } else {
                format!("course {} is not complete yet", c.course)
            }
        })
    }

    pub fn dashboard(&self, entries: &[DashboardEntry]) -> Result<()> {
        self.emit(&entries, |entries| {
            if entries.is_empty() {
                return "no enrollments".to_string();
            }
            entries
                .iter()
                .map(|e| {
                    let badge = if e.certificate_available { "\tcertificate" } else { "" };
                    format!(
                        "{}\t{}\t{}\t{}{badge}",
                        e.course,
                        e.title,
                        percent(e.progress),
                        e.band.as_str()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}
