use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use course_core::model::{CourseId, Lesson, LessonId, LessonStatus, QuizAttemptResult, UserId};

use crate::keys;
use crate::kv::{KeyValueStore, StorageError};

/// Persisted shape of one user's progress on one lesson.
///
/// Mirrors the domain view so the store can serialize without leaking JSON
/// concerns into the domain layer. `video_watched` is monotonic: once true it
/// is never written back to false. `attempt` holds only the latest graded
/// attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ProgressRecord {
    video_watched: bool,
    attempt: Option<QuizAttemptResult>,
}

/// Durable marker that a course-completion event has been delivered once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionRecord {
    completed_at: DateTime<Utc>,
}

/// Per-user, per-lesson progress persistence over the key-value port.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn load(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<ProgressRecord, StorageError> {
        let key = keys::progress(user, course, lesson);
        match self.kv.get(&key).await? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
            }
            None => Ok(ProgressRecord::default()),
        }
    }

    async fn save(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: LessonId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let key = keys::progress(user, course, lesson);
        let raw =
            serde_json::to_string(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put(&key, raw).await
    }

    /// Mark the lesson video as watched. Idempotent and monotonic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or written.
    pub async fn mark_video_watched(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<(), StorageError> {
        let mut record = self.load(user, course, lesson).await?;
        if record.video_watched {
            return Ok(());
        }
        record.video_watched = true;
        self.save(user, course, lesson, &record).await
    }

    /// Record the latest quiz attempt, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or written.
    pub async fn record_quiz_result(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: LessonId,
        attempt: &QuizAttemptResult,
    ) -> Result<(), StorageError> {
        let mut record = self.load(user, course, lesson).await?;
        record.attempt = Some(attempt.clone());
        self.save(user, course, lesson, &record).await
    }

    /// Current status of one lesson for one user.
    ///
    /// `quiz_passed` is `None` only when the lesson has no quiz; a quiz with
    /// no recorded attempt reads as `Some(false)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    pub async fn lesson_status(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: &Lesson,
    ) -> Result<LessonStatus, StorageError> {
        let record = self.load(user, course, lesson.id()).await?;
        let quiz_passed = if lesson.has_quiz() {
            Some(record.attempt.as_ref().is_some_and(|a| a.passed))
        } else {
            None
        };
        Ok(LessonStatus {
            video_watched: record.video_watched,
            quiz_passed,
        })
    }

    /// Latest recorded attempt for a lesson, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    pub async fn quiz_attempt(
        &self,
        user: &UserId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<Option<QuizAttemptResult>, StorageError> {
        Ok(self.load(user, course, lesson).await?.attempt)
    }

    /// True if the completion event for `(user, course)` was already fired.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be read.
    pub async fn completion_recorded(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<bool, StorageError> {
        let key = keys::completion(user, course);
        Ok(self.kv.get(&key).await?.is_some())
    }

    /// Write the one-shot completion marker.
    ///
    /// Returns `true` only when the marker was newly written; a repeat call
    /// leaves the original timestamp in place and returns `false`, which is
    /// what keeps the completion event exactly-once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be read or written.
    pub async fn record_completion(
        &self,
        user: &UserId,
        course: CourseId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let key = keys::completion(user, course);
        if self.kv.get(&key).await?.is_some() {
            return Ok(false);
        }
        let record = CompletionRecord { completed_at };
        let raw =
            serde_json::to_string(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put(&key, raw).await?;
        Ok(true)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
