use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use course_core::Clock;
use course_core::grading::{GradingError, grade};
use course_core::model::{
    AnswerKey, CourseId, CourseProgress, LessonId, QuestionId, QuizAttemptResult, UserId,
};
use storage::{LockoutRegistry, ProgressStore};

use crate::catalog::CourseCatalog;
use crate::completion::CourseCompletionEvaluator;
use crate::error::SessionError;
use crate::events::{ProgressListener, SessionNotice};
use crate::session::{ExitOutcome, QuizSession, TickOutcome};

type SessionKey = (UserId, LessonId);

/// Orchestrates quiz attempts over the storage, catalog and listener ports.
///
/// Holds at most one session per `(user, lesson)`; a terminal session stays
/// in the map (so a repeated submit can return its cached result) until a new
/// `start` replaces it. Designed for single-threaded, event-driven use: the
/// UI event loop calls in, timers call `tick` once per second.
pub struct QuizSessionController {
    clock: Clock,
    catalog: Arc<dyn CourseCatalog>,
    progress: ProgressStore,
    lockouts: LockoutRegistry,
    listener: Arc<dyn ProgressListener>,
    evaluator: CourseCompletionEvaluator,
    sessions: HashMap<SessionKey, QuizSession>,
}

impl QuizSessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CourseCatalog>,
        progress: ProgressStore,
        lockouts: LockoutRegistry,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        let evaluator = CourseCompletionEvaluator::new(progress.clone(), Arc::clone(&listener));
        Self {
            clock,
            catalog,
            progress,
            lockouts,
            listener,
            evaluator,
            sessions: HashMap::new(),
        }
    }

    /// Begin a new quiz attempt. Returns the time budget in seconds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LessonLocked` while a lockout holds,
    /// `SessionError::AlreadyActive` if an attempt is still running,
    /// `SessionError::LessonNotFound` / `SessionError::LessonHasNoQuiz` for
    /// bad targets, and `GradingError::EmptyQuiz` for a quiz with no
    /// questions.
    pub async fn start(
        &mut self,
        user: &UserId,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<u32, SessionError> {
        let now = self.clock.now();
        if self.lockouts.is_locked(user, lesson_id, now).await? {
            let remaining_seconds = self.lockouts.remaining_seconds(user, lesson_id, now).await?;
            return Err(SessionError::LessonLocked { remaining_seconds });
        }

        let key = (user.clone(), lesson_id);
        if self.sessions.get(&key).is_some_and(QuizSession::is_active) {
            return Err(SessionError::AlreadyActive);
        }

        let course = self.catalog.course(course_id).await?;
        let lesson = course
            .lesson(lesson_id)
            .ok_or(SessionError::LessonNotFound(lesson_id))?;
        let quiz = lesson
            .quiz()
            .ok_or(SessionError::LessonHasNoQuiz(lesson_id))?;
        if quiz.question_count() == 0 {
            return Err(GradingError::EmptyQuiz.into());
        }

        let budget = quiz.time_limit_seconds();
        debug!(user = %user, lesson = %lesson_id, budget, "quiz session started");
        self.sessions
            .insert(key, QuizSession::start(course_id, lesson_id, quiz.clone(), now));
        Ok(budget)
    }

    /// The current session for `(user, lesson)`, if one exists.
    #[must_use]
    pub fn session(&self, user: &UserId, lesson: LessonId) -> Option<&QuizSession> {
        self.sessions.get(&(user.clone(), lesson))
    }

    /// Store the answer for one question of the active attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` without a session, plus the
    /// session-level errors (`NotActive`, `UnknownQuestion`).
    pub fn select_answer(
        &mut self,
        user: &UserId,
        lesson: LessonId,
        question: QuestionId,
        keys: HashSet<AnswerKey>,
    ) -> Result<(), SessionError> {
        self.sessions
            .get_mut(&(user.clone(), lesson))
            .ok_or(SessionError::NoSession)?
            .select_answer(question, keys)
    }

    /// One-second timer tick. A tick that exhausts the budget runs the
    /// implicit submit before returning, so the caller observes `TimedOut`
    /// only after the attempt has been graded and persisted.
    ///
    /// # Errors
    ///
    /// Returns session errors from the tick itself, or grading/storage
    /// errors from the implicit submit. If persisting the implicit submit
    /// fails the session moves to `Expired` and the storage error surfaces.
    pub async fn tick(
        &mut self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<TickOutcome, SessionError> {
        let outcome = self
            .sessions
            .get_mut(&(user.clone(), lesson))
            .ok_or(SessionError::NoSession)?
            .tick()?;
        if outcome == TickOutcome::TimedOut {
            self.grade_and_persist(user, lesson, true).await?;
        }
        Ok(outcome)
    }

    /// Count one detected exit attempt (tab hidden, navigation, close).
    ///
    /// Two strikes warn; the third writes the 24-hour lockout record, locks
    /// the session and discards its answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` / `NotActive`, or a storage error
    /// from writing the lockout record.
    pub async fn record_exit_attempt(
        &mut self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<ExitOutcome, SessionError> {
        let outcome = self
            .sessions
            .get_mut(&(user.clone(), lesson))
            .ok_or(SessionError::NoSession)?
            .record_exit_attempt()?;

        match outcome {
            ExitOutcome::Warning {
                strikes_used,
                strikes_max,
            } => {
                warn!(user = %user, lesson = %lesson, strikes_used, strikes_max, "exit attempt during quiz");
                self.listener.session_notice(
                    user,
                    lesson,
                    &SessionNotice::StrikeWarning {
                        strikes_used,
                        strikes_max,
                    },
                );
            }
            ExitOutcome::LockedOut => {
                let now = self.clock.now();
                let locked_until = self.lockouts.lock_default(user, lesson, now).await?;
                warn!(user = %user, lesson = %lesson, %locked_until, "lesson locked after final exit strike");
                self.listener
                    .session_notice(user, lesson, &SessionNotice::LockedOut { locked_until });
            }
        }
        Ok(outcome)
    }

    /// Abandoning the quiz surface (navigation away) is an exit attempt,
    /// never a silent disappearance, so strike accounting survives it.
    ///
    /// # Errors
    ///
    /// Same as [`record_exit_attempt`](Self::record_exit_attempt).
    pub async fn abandon(
        &mut self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<ExitOutcome, SessionError> {
        self.record_exit_attempt(user, lesson).await
    }

    /// Explicit submit. Grades, persists the attempt, and re-evaluates
    /// course completion before returning, so completion is never observed
    /// stale. Submitting an already-submitted attempt returns the cached
    /// result without re-grading.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` / `NotActive`, grading errors, or
    /// storage errors from the persist step.
    pub async fn submit(
        &mut self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<QuizAttemptResult, SessionError> {
        self.grade_and_persist(user, lesson, false).await
    }

    async fn grade_and_persist(
        &mut self,
        user: &UserId,
        lesson: LessonId,
        on_timeout: bool,
    ) -> Result<QuizAttemptResult, SessionError> {
        let key = (user.clone(), lesson);
        let submitted_at = self.clock.now();

        let (course_id, attempt) = {
            let session = self.sessions.get(&key).ok_or(SessionError::NoSession)?;
            if let Some(previous) = session.result() {
                return Ok(previous.clone());
            }
            if !session.is_active() {
                return Err(SessionError::NotActive);
            }
            let attempt = grade(session.quiz(), session.answers())?.into_attempt(submitted_at);
            (session.course_id(), attempt)
        };

        if let Err(err) = self
            .progress
            .record_quiz_result(user, course_id, lesson, &attempt)
            .await
        {
            if on_timeout {
                // a timed-out attempt cannot be retried; mark it Expired
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.expire();
                }
            }
            return Err(err.into());
        }

        if let Some(session) = self.sessions.get_mut(&key) {
            session.finish(attempt.clone());
        }
        info!(
            user = %user,
            lesson = %lesson,
            score = attempt.score_percent,
            passed = attempt.passed,
            timed_out = on_timeout,
            "quiz submitted"
        );

        // completion must be observable before submit returns
        let course = self.catalog.course(course_id).await?;
        self.evaluator
            .notify_if_newly_complete(&course, user, submitted_at)
            .await?;

        Ok(attempt)
    }

    /// Record that the lesson video was fully watched, then re-evaluate
    /// course completion (a quiz-less course can complete through video
    /// watching alone).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LessonNotFound` for an unknown lesson, or
    /// catalog/storage errors.
    pub async fn mark_video_watched(
        &self,
        user: &UserId,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<CourseProgress, SessionError> {
        let course = self.catalog.course(course_id).await?;
        if course.lesson(lesson_id).is_none() {
            return Err(SessionError::LessonNotFound(lesson_id));
        }

        self.progress
            .mark_video_watched(user, course_id, lesson_id)
            .await?;
        let snapshot = self
            .evaluator
            .notify_if_newly_complete(&course, user, self.clock.now())
            .await?;
        Ok(snapshot)
    }

    /// Current whole-course snapshot. Uses the edge-safe evaluation path, so
    /// polling it never re-fires the completion event.
    ///
    /// # Errors
    ///
    /// Returns catalog/storage errors.
    pub async fn course_progress(
        &self,
        user: &UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, SessionError> {
        let course = self.catalog.course(course_id).await?;
        Ok(self
            .evaluator
            .notify_if_newly_complete(&course, user, self.clock.now())
            .await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::events::RecordingListener;
    use crate::session::SessionState;
    use course_core::model::{
        AnswerOption, Course, Lesson, Question, QuestionKind, Quiz, Section,
    };
    use course_core::time::fixed_now;
    use storage::InMemoryKv;

    fn key(s: &str) -> AnswerKey {
        AnswerKey::new(s).unwrap()
    }

    fn single_choice(id: u64, answer: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            QuestionKind::SingleChoice,
            vec![
                AnswerOption::new(key("A"), "a"),
                AnswerOption::new(key("B"), "b"),
            ],
            HashSet::from([key(answer)]),
        )
        .unwrap()
    }

    fn course() -> Course {
        let quiz = Quiz::new(60, 50, vec![single_choice(1, "A"), single_choice(2, "B")]).unwrap();
        let with_quiz =
            Lesson::new(LessonId::new(2), "Quizzed", None, Some(quiz)).unwrap();
        let plain = Lesson::new(LessonId::new(1), "Video only", None, None).unwrap();
        let section = Section::new("Only", vec![plain, with_quiz]).unwrap();
        Course::new(CourseId::new(1), "Course", vec![section]).unwrap()
    }

    fn controller() -> (QuizSessionController, Arc<RecordingListener>) {
        let kv: Arc<dyn storage::KeyValueStore> = Arc::new(InMemoryKv::new());
        let listener = Arc::new(RecordingListener::new());
        let controller = QuizSessionController::new(
            Clock::fixed(fixed_now()),
            Arc::new(InMemoryCatalog::new([course()])),
            ProgressStore::new(Arc::clone(&kv)),
            LockoutRegistry::new(kv),
            listener.clone(),
        );
        (controller, listener)
    }

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn start_rejects_quizless_lesson_and_unknown_lesson() {
        let (mut controller, _) = controller();
        let user = user();

        let err = controller
            .start(&user, CourseId::new(1), LessonId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LessonHasNoQuiz(_)));

        let err = controller
            .start(&user, CourseId::new(1), LessonId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LessonNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_start_fails_while_active() {
        let (mut controller, _) = controller();
        let user = user();

        let budget = controller
            .start(&user, CourseId::new(1), LessonId::new(2))
            .await
            .unwrap();
        assert_eq!(budget, 60);

        let err = controller
            .start(&user, CourseId::new(1), LessonId::new(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyActive));
    }

    #[tokio::test]
    async fn submit_is_idempotent_and_a_new_start_resets_strikes() {
        let (mut controller, _) = controller();
        let user = user();
        let lesson = LessonId::new(2);

        controller
            .start(&user, CourseId::new(1), lesson)
            .await
            .unwrap();
        controller
            .record_exit_attempt(&user, lesson)
            .await
            .unwrap();
        controller
            .select_answer(&user, lesson, QuestionId::new(1), HashSet::from([key("A")]))
            .unwrap();

        let first = controller.submit(&user, lesson).await.unwrap();
        assert_eq!(first.score_percent, 50);
        assert!(first.passed);

        // second submit returns the cached result
        let second = controller.submit(&user, lesson).await.unwrap();
        assert_eq!(first, second);

        // fresh attempt starts clean
        controller
            .start(&user, CourseId::new(1), lesson)
            .await
            .unwrap();
        let session = controller.session(&user, lesson).unwrap();
        assert_eq!(session.exit_strikes(), 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn third_strike_locks_lesson_and_blocks_start() {
        let (mut controller, listener) = controller();
        let user = user();
        let lesson = LessonId::new(2);

        controller
            .start(&user, CourseId::new(1), lesson)
            .await
            .unwrap();
        for _ in 0..2 {
            let outcome = controller.record_exit_attempt(&user, lesson).await.unwrap();
            assert!(matches!(outcome, ExitOutcome::Warning { .. }));
        }
        let outcome = controller.record_exit_attempt(&user, lesson).await.unwrap();
        assert_eq!(outcome, ExitOutcome::LockedOut);

        let err = controller
            .start(&user, CourseId::new(1), lesson)
            .await
            .unwrap_err();
        let SessionError::LessonLocked { remaining_seconds } = err else {
            panic!("expected LessonLocked, got {err:?}");
        };
        assert_eq!(remaining_seconds, storage::LOCKOUT_DURATION_SECS);

        let notices = listener.notices();
        assert_eq!(notices.len(), 3);
        assert!(matches!(
            notices[2].2,
            SessionNotice::LockedOut { .. }
        ));
    }

    #[tokio::test]
    async fn timeout_auto_submits_with_current_answers() {
        let kv: Arc<dyn storage::KeyValueStore> = Arc::new(InMemoryKv::new());
        let quiz = Quiz::new(1, 50, vec![single_choice(1, "A")]).unwrap();
        let lesson = Lesson::new(LessonId::new(1), "Quick", None, Some(quiz)).unwrap();
        let section = Section::new("Only", vec![lesson]).unwrap();
        let course = Course::new(CourseId::new(1), "Course", vec![section]).unwrap();

        let mut controller = QuizSessionController::new(
            Clock::fixed(fixed_now()),
            Arc::new(InMemoryCatalog::new([course])),
            ProgressStore::new(Arc::clone(&kv)),
            LockoutRegistry::new(kv),
            Arc::new(RecordingListener::new()),
        );
        let user = user();

        controller
            .start(&user, CourseId::new(1), LessonId::new(1))
            .await
            .unwrap();
        let outcome = controller.tick(&user, LessonId::new(1)).await.unwrap();
        assert_eq!(outcome, TickOutcome::TimedOut);

        let session = controller.session(&user, LessonId::new(1)).unwrap();
        assert_eq!(session.state(), SessionState::Submitted);
        let result = session.result().unwrap();
        assert_eq!(result.correct_count, 0);
        assert!(!result.passed);
    }
}
