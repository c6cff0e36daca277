use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::services::catalog::{CourseId, LessonId};
use crate::services::EngineError;

pub type NoteId = u32;

/// Annotation pinned to a position inside a lesson's video. Independent of
/// enrollment and progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
    /// Position in seconds within the video, fractional.
    pub timestamp: f64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that may change after creation. Absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub timestamp: Option<f64>,
}

pub struct NoteLedger {
    clock: Arc<dyn Clock>,
    notes: RwLock<Vec<Note>>,
    next_id: AtomicU32,
}

impl NoteLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_notes(clock, Vec::new())
    }

    pub fn with_notes(clock: Arc<dyn Clock>, notes: Vec<Note>) -> Self {
        let next_id = notes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        Self {
            clock,
            notes: RwLock::new(notes),
            next_id: AtomicU32::new(next_id),
        }
    }

    /// Notes for one lesson, ascending by video position.
    pub fn list_by_lesson(&self, course_id: CourseId, lesson_id: LessonId) -> Vec<Note> {
        let notes = self.notes.read();
        let mut matching: Vec<Note> = notes
            .iter()
            .filter(|n| n.course_id == course_id && n.lesson_id == lesson_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        matching
    }

    pub fn create(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
        timestamp: f64,
        title: &str,
        content: &str,
    ) -> Result<Note, EngineError> {
        let title = non_blank(title, "note title must not be empty")?;
        let content = non_blank(content, "note content must not be empty")?;

        let now = self.clock.now();
        let note = Note {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            course_id,
            lesson_id,
            timestamp,
            title,
            content,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().push(note.clone());
        Ok(note)
    }

    /// Merges the provided fields; identifier and createdAt never change.
    pub fn update(&self, note_id: NoteId, changes: NoteUpdate) -> Result<Note, EngineError> {
        let title = changes
            .title
            .as_deref()
            .map(|t| non_blank(t, "note title must not be empty"))
            .transpose()?;
        let content = changes
            .content
            .as_deref()
            .map(|c| non_blank(c, "note content must not be empty"))
            .transpose()?;

        let mut notes = self.notes.write();
        let note = notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| EngineError::not_found("note"))?;

        if let Some(title) = title {
            note.title = title;
        }
        if let Some(content) = content {
            note.content = content;
        }
        if let Some(timestamp) = changes.timestamp {
            note.timestamp = timestamp;
        }
        note.updated_at = self.clock.now();
        Ok(note.clone())
    }

    /// Returns the removed note so callers can confirm or offer undo.
    pub fn delete(&self, note_id: NoteId) -> Result<Note, EngineError> {
        let mut notes = self.notes.write();
        let position = notes
            .iter()
            .position(|n| n.id == note_id)
            .ok_or_else(|| EngineError::not_found("note"))?;
        Ok(notes.remove(position))
    }

    pub fn note_count(&self) -> usize {
        self.notes.read().len()
    }
}

fn non_blank(value: &str, message: &str) -> Result<String, EngineError> {
    if value.trim().is_empty() {
        Err(EngineError::validation(message))
    } else {
        Ok(value.to_string())
    }
}

/// `minutes:seconds` with zero-padded seconds, floor-truncated, for note
/// listings ("3:07" for 187.9).
pub fn format_video_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let minutes = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{minutes}:{secs:02}")
}
