mod course;
mod ids;
mod progress;
mod quiz;

pub use ids::{
    AnswerKey, AnswerKeyError, CourseId, LessonId, ParseIdError, QuestionId, UserId, UserIdError,
};

pub use course::{Course, CourseError, Lesson, Section};
pub use progress::{CourseProgress, LessonStatus, QuizAttemptResult};
pub use quiz::{AnswerOption, Question, QuestionKind, Quiz, QuizError};
