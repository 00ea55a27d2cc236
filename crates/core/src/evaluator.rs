//! Quiz answer checking.
//!
//! Both question kinds use the same rule: a response is correct when it is
//! exactly the answer key as a set. Nothing here touches storage.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{Question, Quiz, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("quiz {quiz} has {questions} questions but {responses} responses were submitted")]
    TooManyResponses {
        quiz: QuizId,
        questions: usize,
        responses: usize,
    },
}

/// Number of correctly answered questions out of the quiz total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: u32,
    pub total: u32,
}

/// Decide whether `submitted` answers `question` correctly.
///
/// Order and duplicates in `submitted` are irrelevant. An empty submission is
/// never credited, even against an empty key.
pub fn evaluate_answer<I, S>(question: &Question, submitted: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let submitted: BTreeSet<String> = submitted
        .into_iter()
        .map(|s| s.as_ref().to_owned())
        .collect();
    if submitted.is_empty() {
        return false;
    }
    submitted == question.correct_answers
}

/// Score a full quiz, one response per question by position.
///
/// Missing trailing responses count as unanswered.
///
/// # Errors
///
/// Returns `EvaluationError::TooManyResponses` if more responses than
/// questions are supplied.
pub fn score_quiz<R>(quiz: &Quiz, responses: &[R]) -> Result<QuizScore, EvaluationError>
where
    R: AsRef<[String]>,
{
    if responses.len() > quiz.questions.len() {
        return Err(EvaluationError::TooManyResponses {
            quiz: quiz.id,
            questions: quiz.questions.len(),
            responses: responses.len(),
        });
    }

    let mut correct = 0_u32;
    for (question, response) in quiz.questions.iter().zip(responses) {
        let response: &[String] = response.as_ref();
        if evaluate_answer(question, response) {
            correct = correct.saturating_add(1);
        }
    }

    Ok(QuizScore {
        correct,
        total: u32::try_from(quiz.questions.len()).unwrap_or(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn question(kind: QuestionKind, correct: &[&str]) -> Question {
        Question {
            text: "Which?".into(),
            kind,
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answers: correct.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn multi_choice_is_order_independent() {
        let q = question(QuestionKind::MultiChoice, &["B", "C"]);
        assert!(evaluate_answer(&q, ["C", "B"]));
        assert!(evaluate_answer(&q, ["B", "C"]));
    }

    #[test]
    fn subset_and_superset_are_wrong() {
        let q = question(QuestionKind::MultiChoice, &["B", "C"]);
        assert!(!evaluate_answer(&q, ["B"]));
        assert!(!evaluate_answer(&q, ["A", "B", "C"]));
    }

    #[test]
    fn empty_submission_is_never_credited() {
        let q = question(QuestionKind::MultiChoice, &["B", "C"]);
        assert!(!evaluate_answer(&q, Vec::<String>::new()));

        let keyless = question(QuestionKind::MultiChoice, &[]);
        assert!(!evaluate_answer(&keyless, Vec::<String>::new()));
    }

    #[test]
    fn duplicates_collapse() {
        let q = question(QuestionKind::SingleChoice, &["A"]);
        assert!(evaluate_answer(&q, ["A", "A"]));
    }

    #[test]
    fn single_choice_uses_same_rule() {
        let q = question(QuestionKind::SingleChoice, &["A"]);
        assert!(evaluate_answer(&q, ["A"]));
        assert!(!evaluate_answer(&q, ["A", "B"]));
    }

    fn quiz() -> Quiz {
        Quiz {
            id: QuizId::new(1),
            title: "Basics".into(),
            questions: vec![
                question(QuestionKind::SingleChoice, &["A"]),
                question(QuestionKind::MultiChoice, &["B", "C"]),
                question(QuestionKind::SingleChoice, &["C"]),
            ],
        }
    }

    #[test]
    fn scores_by_position_without_partial_credit() {
        let responses = vec![
            vec!["A".to_string()],
            vec!["B".to_string()],
            vec!["C".to_string()],
        ];
        let score = score_quiz(&quiz(), &responses).unwrap();
        assert_eq!(score, QuizScore { correct: 2, total: 3 });
    }

    #[test]
    fn missing_responses_count_as_unanswered() {
        let responses = vec![vec!["A".to_string()]];
        let score = score_quiz(&quiz(), &responses).unwrap();
        assert_eq!(score.correct, 1);
        assert_eq!(score.total, 3);
    }

    #[test]
    fn extra_responses_are_rejected() {
        let responses = vec![Vec::<String>::new(); 4];
        let err = score_quiz(&quiz(), &responses).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::TooManyResponses { responses: 4, .. }
        ));
    }
}
