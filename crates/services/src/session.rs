use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use course_core::model::{AnswerKey, CourseId, LessonId, QuestionId, Quiz, QuizAttemptResult};

use crate::error::SessionError;

/// Exit strikes allowed before a session locks the lesson.
pub const MAX_EXIT_STRIKES: u8 = 3;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one quiz attempt.
///
/// `Submitted`, `Locked` and `Expired` are terminal for the attempt; a new
/// attempt starts fresh. "Idle" is represented by the absence of a session in
/// the controller's map, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// Answers graded and persisted.
    Submitted,
    /// Third exit strike; lesson locked, answers discarded.
    Locked,
    /// Timed out but the implicit submit could not be persisted.
    Expired,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_seconds: u32 },
    /// The timer reached zero; the controller performs the implicit submit.
    TimedOut,
}

/// Result of one detected exit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Warning { strikes_used: u8, strikes_max: u8 },
    /// Final strike; the controller writes the lockout record.
    LockedOut,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz attempt.
///
/// A pure value object: every transition happens through a method on this
/// type, never as a side effect of rendering or persistence. Persistence and
/// lockout writes belong to the controller.
#[derive(Debug, Clone)]
pub struct QuizSession {
    course_id: CourseId,
    lesson_id: LessonId,
    quiz: Quiz,
    answers: HashMap<QuestionId, HashSet<AnswerKey>>,
    exit_strikes: u8,
    remaining_seconds: u32,
    started_at: DateTime<Utc>,
    state: SessionState,
    result: Option<QuizAttemptResult>,
}

impl QuizSession {
    /// Begin a fresh attempt with a full time budget and zero strikes.
    pub(crate) fn start(
        course_id: CourseId,
        lesson_id: LessonId,
        quiz: Quiz,
        started_at: DateTime<Utc>,
    ) -> Self {
        let remaining_seconds = quiz.time_limit_seconds();
        Self {
            course_id,
            lesson_id,
            quiz,
            answers: HashMap::new(),
            exit_strikes: 0,
            remaining_seconds,
            started_at,
            state: SessionState::Active,
            result: None,
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(SessionError::NotActive)
        }
    }

    /// Replace the stored answer for a question.
    ///
    /// No correctness validation happens here; grading is deferred to submit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the Active state and
    /// `SessionError::UnknownQuestion` for ids not in the quiz.
    pub fn select_answer(
        &mut self,
        question: QuestionId,
        keys: HashSet<AnswerKey>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.quiz.question(question).is_none() {
            return Err(SessionError::UnknownQuestion(question));
        }
        self.answers.insert(question, keys);
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Reaching zero reports `TimedOut`; the session stays Active so the
    /// controller can run the implicit submit against it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the Active state.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        self.ensure_active()?;
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Ok(TickOutcome::TimedOut)
        } else {
            Ok(TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            })
        }
    }

    /// Count one detected exit attempt.
    ///
    /// Below the limit the session stays Active with answers preserved. The
    /// final strike discards all answers and moves to Locked; the controller
    /// is responsible for the durable lockout record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the Active state.
    pub fn record_exit_attempt(&mut self) -> Result<ExitOutcome, SessionError> {
        self.ensure_active()?;
        self.exit_strikes += 1;
        if self.exit_strikes >= MAX_EXIT_STRIKES {
            self.state = SessionState::Locked;
            self.answers.clear();
            Ok(ExitOutcome::LockedOut)
        } else {
            Ok(ExitOutcome::Warning {
                strikes_used: self.exit_strikes,
                strikes_max: MAX_EXIT_STRIKES,
            })
        }
    }

    /// Record the graded, persisted result and move to Submitted.
    pub(crate) fn finish(&mut self, result: QuizAttemptResult) {
        debug_assert_eq!(self.state, SessionState::Active);
        self.state = SessionState::Submitted;
        self.result = Some(result);
    }

    /// Mark a timed-out attempt whose implicit submit failed to persist.
    pub(crate) fn expire(&mut self) {
        self.state = SessionState::Expired;
    }

    // Accessors

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, HashSet<AnswerKey>> {
        &self.answers
    }

    #[must_use]
    pub fn exit_strikes(&self) -> u8 {
        self.exit_strikes
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The cached result of a submitted attempt, if any.
    #[must_use]
    pub fn result(&self) -> Option<&QuizAttemptResult> {
        self.result.as_ref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
