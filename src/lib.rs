#![allow(dead_code)]

pub mod clock;
pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod workers;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::clock::{Clock, SystemClock};
use crate::seed::SeedError;
use crate::services::notes::NoteLedger;
use crate::services::progress::ProgressTracker;
use crate::services::quiz::QuizSessionService;
use crate::state::AppState;

/// Seeds every service from the embedded fixtures and wires them together.
pub fn build_state() -> Result<AppState, SeedError> {
    let catalog = Arc::new(seed::load_catalog()?);
    let notes = seed::initial_notes()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tracker = Arc::new(ProgressTracker::new(
        Arc::clone(&catalog),
        Arc::clone(&clock),
    ));
    let note_ledger = Arc::new(NoteLedger::with_notes(Arc::clone(&clock), notes));
    let quiz_sessions = QuizSessionService::new(Arc::clone(&clock));

    Ok(AppState::new(catalog, tracker, note_ledger, quiz_sessions))
}

pub fn create_app() -> Result<axum::Router, SeedError> {
    let state = build_state()?;
    Ok(routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
