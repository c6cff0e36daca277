mod courses;
mod health;
mod notes;
mod progress;
mod quizzes;
mod recommendations;
mod sessions;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let middleware_state = state.clone();

    Router::new()
        .nest("/api/courses", courses::router())
        .nest("/api/progress", progress::router())
        .nest("/api/quizzes", quizzes::router())
        .nest("/api/sessions", sessions::router())
        .nest("/api/notes", notes::router())
        .nest("/api/recommendations", recommendations::router())
        .nest("/health", health::router())
        .layer(middleware::from_fn_with_state(
            middleware_state,
            simulate_latency,
        ))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Optional artificial delay, applied once per request so the engine itself
/// stays synchronous.
async fn simulate_latency(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    state.runtime().maybe_latency().await;
    next.run(req).await
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
