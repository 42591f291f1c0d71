use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use course_core::model::{Course, CourseProgress, UserId};
use storage::{ProgressStore, StorageError};

use crate::events::{CompletionEvent, ProgressListener};

/// Recomputes whole-course completion from per-lesson progress.
///
/// The snapshot is derived on demand and never stored; only the one-shot
/// "completion delivered" marker is durable.
#[derive(Clone)]
pub struct CourseCompletionEvaluator {
    progress: ProgressStore,
    listener: Arc<dyn ProgressListener>,
}

impl CourseCompletionEvaluator {
    #[must_use]
    pub fn new(progress: ProgressStore, listener: Arc<dyn ProgressListener>) -> Self {
        Self { progress, listener }
    }

    /// Compute the completion snapshot for one user.
    ///
    /// A lesson counts as complete iff its video is watched and its quiz, if
    /// any, is passed. An empty course is never complete.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any lesson record cannot be read.
    pub async fn evaluate(
        &self,
        course: &Course,
        user: &UserId,
    ) -> Result<CourseProgress, StorageError> {
        let total_lessons = course.lesson_count();
        let mut completed_lessons = 0;
        for lesson in course.lessons() {
            let status = self.progress.lesson_status(user, course.id(), lesson).await?;
            if status.is_complete() {
                completed_lessons += 1;
            }
        }

        Ok(CourseProgress {
            completed_lessons,
            total_lessons,
            is_complete: total_lessons > 0 && completed_lessons == total_lessons,
        })
    }

    /// Evaluate and fire the completion event on the not-complete → complete
    /// edge.
    ///
    /// The edge is detected against the durable marker in the progress store,
    /// so the event fires exactly once per `(user, course)` even across
    /// repeated evaluations or process restarts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if progress records or the marker cannot be
    /// accessed.
    pub async fn notify_if_newly_complete(
        &self,
        course: &Course,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<CourseProgress, StorageError> {
        let snapshot = self.evaluate(course, user).await?;
        if snapshot.is_complete
            && self.progress.record_completion(user, course.id(), now).await?
        {
            info!(user = %user, course = %course.id(), "course completed");
            self.listener.course_completed(&CompletionEvent {
                user: user.clone(),
                course: course.id(),
                completed_at: now,
            });
        }
        Ok(snapshot)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingListener;
    use course_core::model::{CourseId, Lesson, LessonId, Section};
    use course_core::time::fixed_now;
    use storage::InMemoryKv;

    fn course_of_lessons(ids: &[u64]) -> Course {
        let lessons = ids
            .iter()
            .map(|id| Lesson::new(LessonId::new(*id), format!("Lesson {id}"), None, None).unwrap())
            .collect();
        let section = Section::new("Only", lessons).unwrap();
        Course::new(CourseId::new(1), "Course", vec![section]).unwrap()
    }

    #[tokio::test]
    async fn empty_course_is_never_complete() {
        let progress = ProgressStore::new(Arc::new(InMemoryKv::new()));
        let listener = Arc::new(RecordingListener::new());
        let evaluator = CourseCompletionEvaluator::new(progress, listener.clone());
        let course = Course::new(CourseId::new(1), "Empty", Vec::new()).unwrap();
        let user = UserId::new("alice").unwrap();

        let snapshot = evaluator
            .notify_if_newly_complete(&course, &user, fixed_now())
            .await
            .unwrap();
        assert!(!snapshot.is_complete);
        assert_eq!(snapshot.total_lessons, 0);
        assert!(listener.completions().is_empty());
    }

    #[tokio::test]
    async fn completion_event_fires_once_on_the_edge() {
        let progress = ProgressStore::new(Arc::new(InMemoryKv::new()));
        let listener = Arc::new(RecordingListener::new());
        let evaluator = CourseCompletionEvaluator::new(progress.clone(), listener.clone());
        let course = course_of_lessons(&[1, 2]);
        let user = UserId::new("alice").unwrap();

        progress
            .mark_video_watched(&user, course.id(), LessonId::new(1))
            .await
            .unwrap();
        let partial = evaluator
            .notify_if_newly_complete(&course, &user, fixed_now())
            .await
            .unwrap();
        assert_eq!(partial.completed_lessons, 1);
        assert!(!partial.is_complete);
        assert!(listener.completions().is_empty());

        progress
            .mark_video_watched(&user, course.id(), LessonId::new(2))
            .await
            .unwrap();
        let complete = evaluator
            .notify_if_newly_complete(&course, &user, fixed_now())
            .await
            .unwrap();
        assert!(complete.is_complete);
        assert_eq!(listener.completions().len(), 1);

        // re-evaluating an already-complete course must not re-fire
        for _ in 0..3 {
            evaluator
                .notify_if_newly_complete(&course, &user, fixed_now())
                .await
                .unwrap();
        }
        assert_eq!(listener.completions().len(), 1);
    }
}
