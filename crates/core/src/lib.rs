#![forbid(unsafe_code)]

pub mod evaluator;
pub mod model;
pub mod progress;
pub mod time;

pub use evaluator::{EvaluationError, QuizScore, evaluate_answer, score_quiz};
pub use progress::{ContentCounts, Progress, ProgressBand, compute_progress, is_certificate_eligible};
pub use time::Clock;
