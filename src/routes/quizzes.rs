use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{json_error, AppError};
use crate::services::catalog::{CourseId, Quiz};
use crate::services::EngineError;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    course_id: CourseId,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/by-lesson/:lessonId", get(quiz_for_lesson))
        .route("/:id", get(get_quiz))
        .route("/:id/sessions", post(start_session))
}

async fn get_quiz(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(&raw_id, "quiz")?;
    let catalog = state.catalog();
    let quiz = catalog.quiz(quiz_id)?.clone();
    Ok(Json(SuccessResponse {
        success: true,
        data: quiz,
    }))
}

/// Lessons without a quiz yield `null` rather than an error.
async fn quiz_for_lesson(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lesson_id = parse_id(&raw_id, "lesson")?;
    let catalog = state.catalog();
    let quiz: Option<Quiz> = catalog.quiz_for_lesson(lesson_id).cloned();
    Ok(Json(SuccessResponse {
        success: true,
        data: quiz,
    }))
}

/// Starting a session requires an enrollment in the course the attempt is
/// credited to, so a finished session can always be saved.
async fn start_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(&raw_id, "quiz")?;
    let catalog = state.catalog();
    let quiz = catalog.quiz(quiz_id)?.clone();

    if state.tracker().get(payload.course_id).is_none() {
        return Err(EngineError::NotEnrolled {
            course_id: payload.course_id,
        }
        .into());
    }

    let view = state.quiz_sessions().start(quiz, payload.course_id);
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            success: true,
            data: view,
        }),
    ))
}

fn parse_id(raw: &str, label: &str) -> Result<u32, AppError> {
    raw.trim().parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("invalid {label} id: {raw}"),
        )
    })
}
