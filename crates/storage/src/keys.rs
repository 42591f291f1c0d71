//! Key scheme for the key-value port.
//!
//! Every key is scoped by user id plus the owning course or lesson id, so
//! records can never collide across users or courses. The slash-delimited
//! shape is for readability; nothing parses keys back.

use course_core::model::{CourseId, LessonId, UserId};

pub(crate) fn progress(user: &UserId, course: CourseId, lesson: LessonId) -> String {
    format!("progress/{user}/{course}/{lesson}")
}

pub(crate) fn completion(user: &UserId, course: CourseId) -> String {
    format!("completed/{user}/{course}")
}

pub(crate) fn lockout(user: &UserId, lesson: LessonId) -> String {
    format!("lockout/{user}/{lesson}")
}
