use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::{json_error, AppError};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    question_index: usize,
    option_index: usize,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/:sessionId", get(get_session).delete(abandon))
        .route("/:sessionId/answer", post(select_answer))
        .route("/:sessionId/next", post(next_question))
        .route("/:sessionId/previous", post(previous_question))
        .route("/:sessionId/submit", post(submit))
}

async fn get_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let view = state.quiz_sessions().get(session_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

async fn select_answer(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let view =
        state
            .quiz_sessions()
            .select_answer(session_id, payload.question_index, payload.option_index)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

async fn next_question(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let view = state.quiz_sessions().advance(session_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

async fn previous_question(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let view = state.quiz_sessions().retreat(session_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

/// Finishing a quiz both returns the result and writes it into the course
/// progress record.
async fn submit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let attempt = state.quiz_sessions().submit(session_id)?;
    state
        .tracker()
        .save_quiz_result(attempt.course_id, attempt.quiz_id, attempt.result.clone())?;

    Ok(Json(SuccessResponse {
        success: true,
        data: attempt.result,
    }))
}

async fn abandon(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&raw_id)?;
    let view = state.quiz_sessions().abandon(session_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_SESSION_ID",
            format!("invalid session id: {raw}"),
        )
    })
}
