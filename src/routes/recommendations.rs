use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;

use crate::response::AppError;
use crate::services::recommend::recommend_courses;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/", get(list_recommendations))
}

async fn list_recommendations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = state.catalog();
    let enrolled = state.tracker().enrolled_courses();
    let picks = recommend_courses(catalog.courses(), &enrolled);

    Ok(Json(SuccessResponse {
        success: true,
        data: picks,
    }))
}
