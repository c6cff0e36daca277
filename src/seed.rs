//! Embedded fixture data the server boots from.
//!
//! The catalog is immutable for the lifetime of the process, so it is
//! compiled straight into the binary instead of being read from disk or a
//! database at startup.

use serde::de::DeserializeOwned;

use crate::services::catalog::{CatalogStore, Course, Quiz};
use crate::services::notes::Note;

const COURSES_JSON: &str = include_str!("fixtures/courses.json");
const QUIZZES_JSON: &str = include_str!("fixtures/quizzes.json");
const NOTES_JSON: &str = include_str!("fixtures/notes.json");

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("invalid {name} fixture: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses the embedded course and quiz fixtures into a catalog.
pub fn load_catalog() -> Result<CatalogStore, SeedError> {
    let courses: Vec<Course> = parse("courses", COURSES_JSON)?;
    let quizzes: Vec<Quiz> = parse("quizzes", QUIZZES_JSON)?;
    Ok(CatalogStore::new(courses, quizzes))
}

/// Notes present before the user has written any of their own.
pub fn initial_notes() -> Result<Vec<Note>, SeedError> {
    parse("notes", NOTES_JSON)
}

fn parse<T: DeserializeOwned>(name: &'static str, raw: &str) -> Result<T, SeedError> {
    serde_json::from_str(raw).map_err(|source| SeedError::Parse { name, source })
}
