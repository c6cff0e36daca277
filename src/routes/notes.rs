use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{json_error, AppError};
use crate::services::notes::{format_video_timestamp, Note, NoteUpdate};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

/// Note plus its video position rendered the way the player shows it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteView {
    #[serde(flatten)]
    note: Note,
    formatted_timestamp: String,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        let formatted_timestamp = format_video_timestamp(note.timestamp);
        Self {
            note,
            formatted_timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotesQuery {
    #[serde(default)]
    course_id: Option<String>,
    #[serde(default)]
    lesson_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNoteRequest {
    course_id: u32,
    lesson_id: u32,
    #[serde(default)]
    timestamp: f64,
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateNoteRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<f64>,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/:id", patch(update_note).delete(delete_note))
}

async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<NotesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = require_id(params.course_id.as_deref(), "courseId")?;
    let lesson_id = require_id(params.lesson_id.as_deref(), "lessonId")?;

    let notes: Vec<NoteView> = state
        .notes()
        .list_by_lesson(course_id, lesson_id)
        .into_iter()
        .map(NoteView::from)
        .collect();

    Ok(Json(SuccessResponse {
        success: true,
        data: notes,
    }))
}

async fn create_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let note = state.notes().create(
        payload.course_id,
        payload.lesson_id,
        payload.timestamp,
        &payload.title,
        &payload.content,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            success: true,
            data: NoteView::from(note),
        }),
    ))
}

async fn update_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let note_id = parse_note_id(&raw_id)?;
    let changes = NoteUpdate {
        title: payload.title,
        content: payload.content,
        timestamp: payload.timestamp,
    };
    let note = state.notes().update(note_id, changes)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: NoteView::from(note),
    }))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let note_id = parse_note_id(&raw_id)?;
    let removed = state.notes().delete(note_id)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: NoteView::from(removed),
    }))
}

fn require_id(raw: Option<&str>, name: &str) -> Result<u32, AppError> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            format!("{name} query parameter is required"),
        )
    })?;
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("invalid {name}: {raw}"),
        )
    })
}

fn parse_note_id(raw: &str) -> Result<u32, AppError> {
    raw.trim().parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("invalid note id: {raw}"),
        )
    })
}
