//! Shared error types for the services crate.

use thiserror::Error;

use course_core::grading::GradingError;
use course_core::model::{LessonId, QuestionId};
use storage::StorageError;

use crate::catalog::CatalogError;

/// Errors emitted by the quiz session subsystem.
///
/// Every mutating call either succeeds or returns one of these; nothing is
/// swallowed. Storage failures propagate untouched — the engine performs no
/// implicit retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Start refused while a lockout holds; the UI shows the remaining time.
    #[error("lesson is locked for another {remaining_seconds}s")]
    LessonLocked { remaining_seconds: i64 },

    /// A second concurrent start for the same `(user, lesson)`. The caller
    /// should resume the existing session instead.
    #[error("a session for this lesson is already active")]
    AlreadyActive,

    #[error("no session exists for this lesson")]
    NoSession,

    #[error("session is not active")]
    NotActive,

    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),

    #[error("lesson {0} not found in course")]
    LessonNotFound(LessonId),

    #[error("lesson {0} has no quiz")]
    LessonHasNoQuiz(LessonId),

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
