#![allow(dead_code)]

mod session_sweep;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::services::quiz::QuizSessionService;

static WORKER_LEADER: AtomicBool = AtomicBool::new(false);

pub fn is_worker_leader() -> bool {
    WORKER_LEADER.load(Ordering::Relaxed)
}

fn set_worker_leader(val: bool) {
    WORKER_LEADER.store(val, Ordering::Relaxed);
}

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    sessions: Arc<QuizSessionService>,
}

impl WorkerManager {
    pub async fn new(sessions: Arc<QuizSessionService>) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            sessions,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        // Single-process deployment, so the leader defaults to on.
        let leader = std::env::var("WORKER_LEADER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        if !leader {
            info!("WORKER_LEADER disabled, skipping worker startup");
            return Ok(());
        }

        set_worker_leader(true);
        info!("Starting workers (leader mode)");

        let retention_minutes: i64 = std::env::var("SESSION_RETENTION_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let scheduler = self.scheduler.lock().await;

        {
            let sessions = Arc::clone(&self.sessions);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
                let sessions = Arc::clone(&sessions);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = session_sweep::sweep_idle_sessions(
                            sessions,
                            chrono::Duration::minutes(retention_minutes),
                        ) => {}
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(retention_minutes, "Quiz session sweep scheduled (every minute)");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !is_worker_leader() {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        set_worker_leader(false);
        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
