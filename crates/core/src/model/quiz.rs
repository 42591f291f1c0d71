use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AnswerKey, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u8),

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("true/false question must have exactly two options, got {0}")]
    TrueFalseOptionCount(usize),

    #[error("duplicate option key: {0}")]
    DuplicateOptionKey(AnswerKey),

    #[error("question must declare at least one answer key")]
    EmptyAnswerKeys,

    #[error("answer key {0} does not match any option")]
    UnknownAnswerKey(AnswerKey),

    #[error("question kind admits exactly one answer key, got {0}")]
    MultipleAnswersForSingleChoice(usize),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// How a question is answered and graded.
///
/// - `SingleChoice`: one option is selected; exactly one answer key.
/// - `MultiChoice`: any subset of options; one or more answer keys.
/// - `TrueFalse`: a single-choice question over exactly two options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    TrueFalse,
}

impl QuestionKind {
    /// Returns true for kinds whose answer is a one-element set.
    #[must_use]
    pub fn is_single_answer(self) -> bool {
        matches!(self, Self::SingleChoice | Self::TrueFalse)
    }
}

/// One selectable option within a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub key: AnswerKey,
    pub label: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(key: AnswerKey, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
        }
    }
}

/// A single quiz question with its options and correct answer keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    options: Vec<AnswerOption>,
    answer_keys: HashSet<AnswerKey>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the option list is too small for the kind,
    /// option keys collide, the answer key set is empty or references an
    /// unknown option, or a single-answer kind declares more than one key.
    pub fn new(
        id: QuestionId,
        kind: QuestionKind,
        options: Vec<AnswerOption>,
        answer_keys: HashSet<AnswerKey>,
    ) -> Result<Self, QuizError> {
        match kind {
            QuestionKind::TrueFalse => {
                if options.len() != 2 {
                    return Err(QuizError::TrueFalseOptionCount(options.len()));
                }
            }
            QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
                if options.len() < 2 {
                    return Err(QuizError::TooFewOptions(options.len()));
                }
            }
        }

        let mut seen: HashSet<&AnswerKey> = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(&option.key) {
                return Err(QuizError::DuplicateOptionKey(option.key.clone()));
            }
        }

        if answer_keys.is_empty() {
            return Err(QuizError::EmptyAnswerKeys);
        }
        for key in &answer_keys {
            if !seen.contains(key) {
                return Err(QuizError::UnknownAnswerKey(key.clone()));
            }
        }
        if kind.is_single_answer() && answer_keys.len() != 1 {
            return Err(QuizError::MultipleAnswersForSingleChoice(answer_keys.len()));
        }

        Ok(Self {
            id,
            kind,
            options,
            answer_keys,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn answer_keys(&self) -> &HashSet<AnswerKey> {
        &self.answer_keys
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A timed lesson quiz.
///
/// Question order is significant: grading reports verdicts in this order.
/// An empty question list is representable (catalog drafts); grading rejects
/// it at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    time_limit_seconds: u32,
    passing_score_percent: u8,
    questions: Vec<Question>,
}

impl Quiz {
    /// Creates a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTimeLimit` for a zero time limit and
    /// `QuizError::InvalidPassingScore` for a passing score above 100.
    pub fn new(
        time_limit_seconds: u32,
        passing_score_percent: u8,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if time_limit_seconds == 0 {
            return Err(QuizError::InvalidTimeLimit);
        }
        if passing_score_percent > 100 {
            return Err(QuizError::InvalidPassingScore(passing_score_percent));
        }

        Ok(Self {
            time_limit_seconds,
            passing_score_percent,
            questions,
        })
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    #[must_use]
    pub fn passing_score_percent(&self) -> u8 {
        self.passing_score_percent
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
