use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{json_error, AppError};
use crate::services::catalog::{CatalogQuery, Course, Difficulty, DurationBand};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseListQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    duration: Option<String>,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_courses))
        .route("/:id", get(get_course))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = CatalogQuery {
        search: non_empty(params.search),
        category: non_empty(params.category),
        difficulty: match non_empty(params.difficulty) {
            Some(raw) => Some(parse_difficulty(&raw)?),
            None => None,
        },
        duration: match non_empty(params.duration) {
            Some(raw) => Some(DurationBand::parse(&raw).ok_or_else(|| {
                json_error(
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    format!("unknown duration filter: {raw}"),
                )
            })?),
            None => None,
        },
    };

    let catalog = state.catalog();
    let courses: Vec<Course> = catalog.search(&query).into_iter().cloned().collect();

    Ok(Json(SuccessResponse {
        success: true,
        data: courses,
    }))
}

async fn get_course(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = parse_course_id(&raw_id)?;
    let catalog = state.catalog();
    let course = catalog.course(course_id)?.clone();

    Ok(Json(SuccessResponse {
        success: true,
        data: course,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, AppError> {
    match raw.trim() {
        "Beginner" => Ok(Difficulty::Beginner),
        "Intermediate" => Ok(Difficulty::Intermediate),
        "Advanced" => Ok(Difficulty::Advanced),
        other => Err(json_error(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            format!("unknown difficulty filter: {other}"),
        )),
    }
}

fn parse_course_id(raw: &str) -> Result<u32, AppError> {
    raw.trim().parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("invalid course id: {raw}"),
        )
    })
}
