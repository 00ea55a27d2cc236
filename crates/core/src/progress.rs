//! Progress aggregation and certificate gating.
//!
//! The percentage is always derived from the completion sets and the catalog
//! as it stands at call time; it is never cached.

use serde::Serialize;

use crate::model::{CourseOutline, Enrollment};

/// Total completable items of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContentCounts {
    pub lessons: usize,
    pub quizzes: usize,
}

impl ContentCounts {
    #[must_use]
    pub fn new(lessons: usize, quizzes: usize) -> Self {
        Self { lessons, quizzes }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.lessons.saturating_add(self.quizzes)
    }
}

/// Completion percentage in `[0, 100]`, kept at full precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Progress(f64);

impl Progress {
    pub const COMPLETE: Progress = Progress(100.0);

    /// Percentage of `done` items out of `counts`.
    ///
    /// An empty course yields `0`, never a division error.
    #[must_use]
    pub fn from_counts(done: usize, counts: ContentCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self(0.0);
        }
        // item counts stay far below 2^52
        #[allow(clippy::cast_precision_loss)]
        let pct = 100.0 * done as f64 / total as f64;
        Self(pct.clamp(0.0, 100.0))
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Exact comparison against 100; only true completion qualifies.
    #[must_use]
    pub fn is_complete(self) -> bool {
        #[allow(clippy::float_cmp)]
        let complete = self.0 == 100.0;
        complete
    }

    /// Rounded for display. Stored and compared values never go through this.
    #[must_use]
    pub fn rounded(self, decimals: u8) -> f64 {
        let factor = 10_f64.powi(i32::from(decimals));
        (self.0 * factor).round() / factor
    }

    #[must_use]
    pub fn band(self) -> ProgressBand {
        ProgressBand::from_progress(self)
    }
}

/// Dashboard bucket for a progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBand {
    /// Up to 20 %.
    Low,
    /// Up to 50 %.
    Fair,
    /// Up to 80 %.
    Good,
    High,
}

impl ProgressBand {
    #[must_use]
    pub fn from_progress(progress: Progress) -> Self {
        match progress.percent() {
            p if p <= 20.0 => Self::Low,
            p if p <= 50.0 => Self::Fair,
            p if p <= 80.0 => Self::Good,
            _ => Self::High,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressBand::Low => "low",
            ProgressBand::Fair => "fair",
            ProgressBand::Good => "good",
            ProgressBand::High => "high",
        }
    }
}

/// Recompute the progress of `enrollment` against the course as it is now.
///
/// Completed ids that no longer belong to the course are not counted.
#[must_use]
pub fn compute_progress(enrollment: &Enrollment, outline: &CourseOutline) -> Progress {
    let lessons = enrollment
        .completed_lessons()
        .iter()
        .filter(|id| outline.lessons.contains(*id))
        .count();
    let quizzes = enrollment
        .completed_quizzes()
        .iter()
        .filter(|id| outline.quizzes.contains_key(*id))
        .count();
    Progress::from_counts(lessons + quizzes, outline.counts())
}

/// A certificate is available only at exactly 100 % of the current catalog.
#[must_use]
pub fn is_certificate_eligible(enrollment: &Enrollment, outline: &CourseOutline) -> bool {
    compute_progress(enrollment, outline).is_complete()
}
