use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest graded attempt for a `(user, lesson)` pair.
///
/// Each new submission overwrites the previous one; attempt history is not
/// retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttemptResult {
    pub correct_count: u32,
    pub total_count: u32,
    pub score_percent: u8,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Per-lesson progress view for one user.
///
/// `quiz_passed` is `None` only when the lesson has no quiz; a quiz with no
/// recorded attempt reads as `Some(false)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonStatus {
    pub video_watched: bool,
    pub quiz_passed: Option<bool>,
}

impl LessonStatus {
    /// A lesson is complete when the video is watched and any quiz is passed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.video_watched && self.quiz_passed.unwrap_or(true)
    }
}

/// Whole-course completion snapshot, derived on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub is_complete: bool,
}
