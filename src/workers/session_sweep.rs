use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::services::quiz::QuizSessionService;

/// Drops quiz sessions whose client has gone quiet. Countdown ticks do not
/// count as contact, so an abandoned in-progress session ages out too.
pub async fn sweep_idle_sessions(sessions: Arc<QuizSessionService>, retention: chrono::Duration) {
    let start = Instant::now();
    debug!("Starting quiz session sweep");

    let removed = sessions.sweep_stale(retention);
    if removed > 0 {
        info!(
            removed,
            duration_secs = format!("{:.2}", start.elapsed().as_secs_f64()),
            "Quiz session sweep completed"
        );
    }
}
