use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};
use crate::model::quiz::Quiz;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("section title cannot be empty")]
    EmptySectionTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("lesson id {0} appears more than once in the course")]
    DuplicateLessonId(LessonId),
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One unit of course content: an optional video plus an optional quiz.
///
/// A lesson with neither is legal catalog content; it completes as soon as
/// its (vacuously absent) video requirement is met by the progress engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    video_ref: Option<String>,
    quiz: Option<Quiz>,
}

impl Lesson {
    /// Creates a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyLessonTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        video_ref: Option<String>,
        quiz: Option<Quiz>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyLessonTitle);
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            video_ref,
            quiz,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn video_ref(&self) -> Option<&str> {
        self.video_ref.as_deref()
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        self.quiz.is_some()
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// An ordered group of lessons under a shared title.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    title: String,
    lessons: Vec<Lesson>,
}

impl Section {
    /// Creates a new section.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptySectionTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(title: impl Into<String>, lessons: Vec<Lesson>) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptySectionTitle);
        }

        Ok(Self {
            title: title.trim().to_owned(),
            lessons,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// An immutable course: ordered sections of ordered lessons.
///
/// Lesson ids are unique across the whole course, so per-lesson progress and
/// lockout records can be keyed by `(user, lesson)` without ambiguity.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    sections: Vec<Section>,
}

impl Course {
    /// Creates a new course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title and
    /// `CourseError::DuplicateLessonId` if a lesson id repeats anywhere in
    /// the section list.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        sections: Vec<Section>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen: HashSet<LessonId> = HashSet::new();
        for section in &sections {
            for lesson in section.lessons() {
                if !seen.insert(lesson.id()) {
                    return Err(CourseError::DuplicateLessonId(lesson.id()));
                }
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            sections,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// All lessons in section order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.sections.iter().flat_map(|s| s.lessons().iter())
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id() == id)
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons().len()).sum()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
