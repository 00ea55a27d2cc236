use async_trait::async_trait;
use serde::Serialize;

use course_core::Progress;
use course_core::model::{CourseId, LessonId, QuizId, StudentId};

use crate::error::NotifyError;

/// Side effect emitted after a committed enrollment transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    LessonCompleted {
        student: StudentId,
        course: CourseId,
        lesson: LessonId,
        progress: Progress,
    },
    QuizSubmitted {
        student: StudentId,
        course: CourseId,
        quiz: QuizId,
        score: u32,
        progress: Progress,
    },
    /// A newly recorded item moved progress from below 100 to exactly 100.
    CertificateUnlocked { student: StudentId, course: CourseId },
}

impl ProgressEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LessonCompleted { .. } => "lesson_completed",
            Self::QuizSubmitted { .. } => "quiz_submitted",
            Self::CertificateUnlocked { .. } => "certificate_unlocked",
        }
    }
}

/// Receiver for progress events.
///
/// Delivery errors are reported back to the caller, which logs them; the
/// transition that produced the event is already committed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` when the event could not be handed off.
    async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifyError>;
}

/// Records events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifyError> {
        match event {
            ProgressEvent::LessonCompleted {
                student,
                course,
                lesson,
                progress,
            } => tracing::info!(
                %student,
                %course,
                %lesson,
                progress = progress.percent(),
                "lesson completed"
            ),
            ProgressEvent::QuizSubmitted {
                student,
                course,
                quiz,
                score,
                progress,
            } => tracing::info!(
                %student,
                %course,
                %quiz,
                score,
                progress = progress.percent(),
                "quiz submitted"
            ),
            ProgressEvent::CertificateUnlocked { student, course } => {
                tracing::info!(%student, %course, "certificate unlocked");
            }
        }
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, _event: &ProgressEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
