use chrono::{DateTime, Utc};
use std::sync::Mutex;

use course_core::model::{CourseId, LessonId, UserId};

/// One-shot notification that a user finished every lesson of a course.
///
/// Consumed by the certificate-eligibility gate; the engine neither renders
/// nor stores certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub user: UserId,
    pub course: CourseId,
    pub completed_at: DateTime<Utc>,
}

/// Informational notices emitted during a quiz attempt, for UI display.
/// No retry semantics are required of the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    StrikeWarning { strikes_used: u8, strikes_max: u8 },
    LockedOut { locked_until: DateTime<Utc> },
}

/// Listener port for events produced by the engine.
///
/// Default implementations ignore everything, so consumers subscribe only to
/// what they care about.
pub trait ProgressListener: Send + Sync {
    fn course_completed(&self, _event: &CompletionEvent) {}

    fn session_notice(&self, _user: &UserId, _lesson: LessonId, _notice: &SessionNotice) {}
}

/// Listener that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {}

/// Listener that records everything it sees, for test assertions.
#[derive(Default)]
pub struct RecordingListener {
    completions: Mutex<Vec<CompletionEvent>>,
    notices: Mutex<Vec<(UserId, LessonId, SessionNotice)>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.completions.lock().expect("listener lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn notices(&self) -> Vec<(UserId, LessonId, SessionNotice)> {
        self.notices.lock().expect("listener lock poisoned").clone()
    }
}

impl ProgressListener for RecordingListener {
    fn course_completed(&self, event: &CompletionEvent) {
        self.completions
            .lock()
            .expect("listener lock poisoned")
            .push(event.clone());
    }

    fn session_notice(&self, user: &UserId, lesson: LessonId, notice: &SessionNotice) {
        self.notices
            .lock()
            .expect("listener lock poisoned")
            .push((user.clone(), lesson, notice.clone()));
    }
}
