use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use course_core::model::{Course, CourseId};

/// Errors surfaced by catalog sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course {0} not found")]
    NotFound(CourseId),

    #[error("catalog source error: {0}")]
    Source(String),
}

/// Read-only source of course definitions.
///
/// Catalog content is immutable from the engine's point of view: the port
/// only reads, and the returned `Course` is an owned snapshot.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Fetch a course by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if missing, or `CatalogError::Source`
    /// for backend failures.
    async fn course(&self, id: CourseId) -> Result<Course, CatalogError>;
}

/// Fixed in-memory catalog for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    courses: HashMap<CourseId, Course>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(courses: impl IntoIterator<Item = Course>) -> Self {
        Self {
            courses: courses.into_iter().map(|c| (c.id(), c)).collect(),
        }
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn course(&self, id: CourseId) -> Result<Course, CatalogError> {
        self.courses
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }
}
