use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, ModuleId, QuizId};
use crate::progress::ContentCounts;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("module {0} appears more than once")]
    DuplicateModule(ModuleId),

    #[error("lesson {0} appears more than once")]
    DuplicateLesson(LessonId),

    #[error("quiz {0} appears more than once")]
    DuplicateQuiz(QuizId),

    #[error("quiz {quiz} question {position}: option {option:?} is listed twice")]
    DuplicateOption {
        quiz: QuizId,
        position: usize,
        option: String,
    },

    #[error("quiz {quiz} question {position}: correct answer {answer:?} is not an option")]
    UnknownCorrectAnswer {
        quiz: QuizId,
        position: usize,
        answer: String,
    },

    #[error("quiz {quiz} question {position}: single-choice needs exactly one correct answer, got {count}")]
    SingleChoiceArity {
        quiz: QuizId,
        position: usize,
        count: usize,
    },
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Presentation tag of a lesson. Progress logic treats every kind the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LessonKind {
    Video,
    Text,
    Document,
}

impl LessonKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Video => "video",
            LessonKind::Text => "text",
            LessonKind::Document => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub kind: LessonKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single-choice",
            QuestionKind::MultiChoice => "multi-choice",
        }
    }
}

/// One question of a quiz with its answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub correct_answers: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// A module keeps lessons and quizzes in two independent orderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Course {
    /// Check structural rules of the catalog entry.
    ///
    /// # Errors
    ///
    /// Returns the first `CatalogError` found, walking modules in order.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }

        let mut modules = HashSet::new();
        let mut lessons = HashSet::new();
        let mut quizzes = HashSet::new();

        for module in &self.modules {
            if !modules.insert(module.id) {
                return Err(CatalogError::DuplicateModule(module.id));
            }
            for lesson in &module.lessons {
                if !lessons.insert(lesson.id) {
                    return Err(CatalogError::DuplicateLesson(lesson.id));
                }
            }
            for quiz in &module.quizzes {
                if !quizzes.insert(quiz.id) {
                    return Err(CatalogError::DuplicateQuiz(quiz.id));
                }
                for (position, question) in quiz.questions.iter().enumerate() {
                    validate_question(quiz.id, position, question)?;
                }
            }
        }
        Ok(())
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    pub fn quizzes(&self) -> impl Iterator<Item = &Quiz> {
        self.modules.iter().flat_map(|m| m.quizzes.iter())
    }

    #[must_use]
    pub fn contains_lesson(&self, id: LessonId) -> bool {
        self.lessons().any(|l| l.id == id)
    }

    #[must_use]
    pub fn find_quiz(&self, id: QuizId) -> Option<&Quiz> {
        self.quizzes().find(|q| q.id == id)
    }

    /// Membership view used by the progress aggregator.
    #[must_use]
    pub fn outline(&self) -> CourseOutline {
        CourseOutline {
            course: self.id,
            lessons: self.lessons().map(|l| l.id).collect(),
            quizzes: self
                .quizzes()
                .map(|q| (q.id, q.question_count()))
                .collect(),
        }
    }
}

fn validate_question(quiz: QuizId, position: usize, question: &Question) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for option in &question.options {
        if !seen.insert(option.as_str()) {
            return Err(CatalogError::DuplicateOption {
                quiz,
                position,
                option: option.clone(),
            });
        }
    }
    if let Some(answer) = question
        .correct_answers
        .iter()
        .find(|a| !seen.contains(a.as_str()))
    {
        return Err(CatalogError::UnknownCorrectAnswer {
            quiz,
            position,
            answer: answer.clone(),
        });
    }
    if question.kind == QuestionKind::SingleChoice && question.correct_answers.len() != 1 {
        return Err(CatalogError::SingleChoiceArity {
            quiz,
            position,
            count: question.correct_answers.len(),
        });
    }
    Ok(())
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// The completable items of a course as seen at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    pub course: CourseId,
    pub lessons: BTreeSet<LessonId>,
    /// Quiz ids mapped to their question count.
    pub quizzes: BTreeMap<QuizId, usize>,
}

impl CourseOutline {
    #[must_use]
    pub fn counts(&self) -> ContentCounts {
        ContentCounts::new(self.lessons.len(), self.quizzes.len())
    }

    #[must_use]
    pub fn contains_lesson(&self, id: LessonId) -> bool {
        self.lessons.contains(&id)
    }

    #[must_use]
    pub fn question_count(&self, id: QuizId) -> Option<usize> {
        self.quizzes.get(&id).copied()
    }
}
