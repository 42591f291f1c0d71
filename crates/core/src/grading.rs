//! Pure grading of a submitted answer set against a quiz.
//!
//! No I/O and no clock access: the caller supplies the submission timestamp
//! when converting a [`GradeResult`] into a persisted attempt.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::{AnswerKey, QuestionId, Quiz, QuizAttemptResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    #[error("quiz has no questions")]
    EmptyQuiz,
}

/// Verdict for one question, in quiz order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionGrade {
    pub question_id: QuestionId,
    pub correct: bool,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    question_grades: Vec<QuestionGrade>,
    correct_count: u32,
    total_count: u32,
    score_percent: u8,
    passed: bool,
}

impl GradeResult {
    #[must_use]
    pub fn question_grades(&self) -> &[QuestionGrade] {
        &self.question_grades
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score_percent
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Convert into the persisted attempt record.
    #[must_use]
    pub fn into_attempt(self, submitted_at: DateTime<Utc>) -> QuizAttemptResult {
        QuizAttemptResult {
            correct_count: self.correct_count,
            total_count: self.total_count,
            score_percent: self.score_percent,
            passed: self.passed,
            submitted_at,
        }
    }
}

/// Grade a submission against a quiz.
///
/// A question is correct iff the submitted key set equals its answer keys
/// exactly; unanswered questions count as incorrect. The score is
/// `correct / total * 100` rounded half-up, and `passed` compares it against
/// the quiz passing score.
///
/// # Errors
///
/// Returns `GradingError::EmptyQuiz` if the quiz has zero questions.
pub fn grade(
    quiz: &Quiz,
    answers: &HashMap<QuestionId, HashSet<AnswerKey>>,
) -> Result<GradeResult, GradingError> {
    if quiz.question_count() == 0 {
        return Err(GradingError::EmptyQuiz);
    }

    let mut question_grades = Vec::with_capacity(quiz.question_count());
    let mut correct_count = 0_u32;

    for question in quiz.questions() {
        let correct = answers
            .get(&question.id())
            .is_some_and(|submitted| submitted == question.answer_keys());
        if correct {
            correct_count += 1;
        }
        question_grades.push(QuestionGrade {
            question_id: question.id(),
            correct,
        });
    }

    let total_count = u32::try_from(quiz.question_count()).unwrap_or(u32::MAX);
    let score_percent = score_percent(correct_count, total_count);
    let passed = score_percent >= quiz.passing_score_percent();

    Ok(GradeResult {
        question_grades,
        correct_count,
        total_count,
        score_percent,
        passed,
    })
}

/// `round(correct / total * 100)` with half-up rounding, in integer math.
fn score_percent(correct: u32, total: u32) -> u8 {
    debug_assert!(total > 0 && correct <= total);
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Question, QuestionKind};

    fn key(s: &str) -> AnswerKey {
        AnswerKey::new(s).unwrap()
    }

    fn single_choice(id: u64, answer: &str) -> Question {
        let options = vec![
            AnswerOption::new(key("A"), "a"),
            AnswerOption::new(key("B"), "b"),
            AnswerOption::new(key("C"), "c"),
        ];
        Question::new(
            QuestionId::new(id),
            QuestionKind::SingleChoice,
            options,
            HashSet::from([key(answer)]),
        )
        .unwrap()
    }

    fn multi_choice(id: u64, answer: &[&str]) -> Question {
        let options = vec![
            AnswerOption::new(key("A"), "a"),
            AnswerOption::new(key("B"), "b"),
            AnswerOption::new(key("C"), "c"),
        ];
        let keys = answer.iter().map(|k| key(k)).collect();
        Question::new(QuestionId::new(id), QuestionKind::MultiChoice, options, keys).unwrap()
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let quiz = Quiz::new(60, 70, Vec::new()).unwrap();
        let err = grade(&quiz, &HashMap::new()).unwrap_err();
        assert_eq!(err, GradingError::EmptyQuiz);
    }

    #[test]
    fn exact_set_equality_decides_correctness() {
        let quiz = Quiz::new(60, 50, vec![multi_choice(1, &["B", "C"])]).unwrap();

        // Exact match passes, a superset or subset does not.
        let exact = HashMap::from([(QuestionId::new(1), HashSet::from([key("C"), key("B")]))]);
        assert!(grade(&quiz, &exact).unwrap().question_grades()[0].correct);

        let subset = HashMap::from([(QuestionId::new(1), HashSet::from([key("B")]))]);
        assert!(!grade(&quiz, &subset).unwrap().question_grades()[0].correct);

        let superset = HashMap::from([(
            QuestionId::new(1),
            HashSet::from([key("A"), key("B"), key("C")]),
        )]);
        assert!(!grade(&quiz, &superset).unwrap().question_grades()[0].correct);
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let quiz = Quiz::new(60, 50, vec![single_choice(1, "A"), single_choice(2, "B")]).unwrap();
        let answers = HashMap::from([(QuestionId::new(1), HashSet::from([key("A")]))]);

        let result = grade(&quiz, &answers).unwrap();
        assert_eq!(result.correct_count(), 1);
        assert_eq!(result.total_count(), 2);
        assert_eq!(result.score_percent(), 50);
    }

    #[test]
    fn two_of_three_rounds_to_67_and_fails_at_70() {
        let quiz = Quiz::new(
            60,
            70,
            vec![
                single_choice(1, "A"),
                single_choice(2, "B"),
                single_choice(3, "C"),
            ],
        )
        .unwrap();
        let answers = HashMap::from([
            (QuestionId::new(1), HashSet::from([key("A")])),
            (QuestionId::new(2), HashSet::from([key("B")])),
            (QuestionId::new(3), HashSet::from([key("A")])),
        ]);

        let result = grade(&quiz, &answers).unwrap();
        assert_eq!(result.score_percent(), 67);
        assert!(!result.passed());
    }

    #[test]
    fn passing_score_boundary_is_inclusive() {
        let quiz = Quiz::new(60, 50, vec![single_choice(1, "A"), single_choice(2, "B")]).unwrap();
        let answers = HashMap::from([(QuestionId::new(1), HashSet::from([key("A")]))]);

        let result = grade(&quiz, &answers).unwrap();
        assert_eq!(result.score_percent(), 50);
        assert!(result.passed());
    }

    #[test]
    fn half_up_rounding() {
        // 1/8 = 12.5 rounds to 13, 3/8 = 37.5 rounds to 38.
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(3, 8), 38);
        assert_eq!(score_percent(0, 3), 0);
        assert_eq!(score_percent(3, 3), 100);
    }

    #[test]
    fn grading_is_deterministic() {
        let quiz = Quiz::new(60, 50, vec![multi_choice(1, &["A", "C"])]).unwrap();
        let answers = HashMap::from([(QuestionId::new(1), HashSet::from([key("A"), key("C")]))]);

        let first = grade(&quiz, &answers).unwrap();
        let second = grade(&quiz, &answers).unwrap();
        assert_eq!(first, second);
        assert!(first.passed());
    }

    #[test]
    fn attempt_conversion_carries_all_fields() {
        let quiz = Quiz::new(60, 50, vec![single_choice(1, "A")]).unwrap();
        let answers = HashMap::from([(QuestionId::new(1), HashSet::from([key("A")]))]);
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let attempt = grade(&quiz, &answers).unwrap().into_attempt(at);
        assert_eq!(attempt.correct_count, 1);
        assert_eq!(attempt.total_count, 1);
        assert_eq!(attempt.score_percent, 100);
        assert!(attempt.passed);
        assert_eq!(attempt.submitted_at, at);
    }
}
