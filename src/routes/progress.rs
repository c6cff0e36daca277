use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{json_error, AppError};
use crate::services::progress::Progress;
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: usize = 20;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    #[serde(default)]
    limit: Option<usize>,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_enrolled))
        .route("/summary", get(summary))
        .route("/activity", get(recent_activity))
        .route("/:courseId", get(get_progress))
        .route("/:courseId/enroll", post(enroll))
        .route("/:courseId/lessons/:lessonId/complete", post(complete_lesson))
}

async fn list_enrolled(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let enrolled = state.tracker().enrolled_courses();
    Ok(Json(SuccessResponse {
        success: true,
        data: enrolled,
    }))
}

async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summary = state.tracker().summary();
    Ok(Json(SuccessResponse {
        success: true,
        data: summary,
    }))
}

async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let feed = state.tracker().recent_activity(limit);
    Ok(Json(SuccessResponse {
        success: true,
        data: feed,
    }))
}

/// Absence of a record is not an error here; the data is simply `null`.
async fn get_progress(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = parse_id(&raw_id, "course")?;
    let progress: Option<Progress> = state.tracker().get(course_id);
    Ok(Json(SuccessResponse {
        success: true,
        data: progress,
    }))
}

async fn enroll(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = parse_id(&raw_id, "course")?;
    let progress = state.tracker().enroll(course_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: progress,
    }))
}

async fn complete_lesson(
    State(state): State<AppState>,
    Path((raw_course, raw_lesson)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = parse_id(&raw_course, "course")?;
    let lesson_id = parse_id(&raw_lesson, "lesson")?;
    let progress = state.tracker().complete_lesson(course_id, lesson_id)?;
    Ok(Json(SuccessResponse {
        success: true,
        data: progress,
    }))
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
