#![forbid(unsafe_code)]

pub mod catalog;
pub mod completion;
pub mod controller;
pub mod error;
pub mod events;
pub mod session;

pub use course_core::Clock;

pub use catalog::{CatalogError, CourseCatalog, InMemoryCatalog};
pub use completion::CourseCompletionEvaluator;
pub use controller::QuizSessionController;
pub use error::SessionError;
pub use events::{
    CompletionEvent, NoopListener, ProgressListener, RecordingListener, SessionNotice,
};
pub use session::{ExitOutcome, MAX_EXIT_STRIKES, QuizSession, SessionState, TickOutcome};
