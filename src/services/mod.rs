pub mod catalog;
pub mod notes;
pub mod progress;
pub mod quiz;
pub mod recommend;

use crate::services::catalog::CourseId;

/// Failure vocabulary shared by every engine service. All operations fail
/// synchronously with one of these and leave prior state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not enrolled in course {course_id}")]
    NotEnrolled { course_id: CourseId },
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{0}")]
    Validation(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
