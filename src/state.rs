use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::services::catalog::CatalogStore;
use crate::services::notes::NoteLedger;
use crate::services::progress::ProgressTracker;
use crate::services::quiz::QuizSessionService;

/// Toggles that can change while the server is running.
///
/// Simulated latency lives here rather than in the engine: the engine stays
/// synchronous and the delay is applied once per request at the transport
/// boundary.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub latency_enabled: AtomicBool,
    pub latency_ms: AtomicU64,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("SIMULATE_LATENCY")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let ms = std::env::var("SIMULATE_LATENCY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Self {
            latency_enabled: AtomicBool::new(enabled),
            latency_ms: AtomicU64::new(ms),
        }
    }

    pub fn is_latency_enabled(&self) -> bool {
        self.latency_enabled.load(Ordering::Relaxed)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms.load(Ordering::Relaxed))
    }

    pub async fn maybe_latency(&self) {
        if self.is_latency_enabled() {
            let delay = self.latency();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            latency_enabled: AtomicBool::new(false),
            latency_ms: AtomicU64::new(300),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    catalog: Arc<CatalogStore>,
    tracker: Arc<ProgressTracker>,
    notes: Arc<NoteLedger>,
    quiz_sessions: Arc<QuizSessionService>,
    runtime: Arc<RuntimeConfig>,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogStore>,
        tracker: Arc<ProgressTracker>,
        notes: Arc<NoteLedger>,
        quiz_sessions: Arc<QuizSessionService>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            catalog,
            tracker,
            notes,
            quiz_sessions,
            runtime: Arc::new(RuntimeConfig::from_env()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn catalog(&self) -> Arc<CatalogStore> {
        Arc::clone(&self.catalog)
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn notes(&self) -> Arc<NoteLedger> {
        Arc::clone(&self.notes)
    }

    pub fn quiz_sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz_sessions)
    }

    pub fn runtime(&self) -> Arc<RuntimeConfig> {
        Arc::clone(&self.runtime)
    }
}
