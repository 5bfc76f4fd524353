//! Periodic ingestion with overlap control.
//!
//! Each tick spawns the run on its own task, so a slow fetch never delays the
//! timer. A shared flag admits at most one run at a time; ticks that land
//! while a run is in progress are skipped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::models::UpsertSummary;
use crate::services::Ingestor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(UpsertSummary),
    Failed(String),
    /// Another run was already in progress.
    Skipped,
}

/// Held for the duration of a run; dropping it marks the scheduler idle,
/// including when the run panics.
struct RunPermit(Arc<AtomicBool>);

impl RunPermit {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    ingestor: Ingestor,
    running: Arc<AtomicBool>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            handle: None,
        }
    }

    /// Whether the timer loop is active.
    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether an ingestion run is in progress right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start firing triggers every `period`. The first one fires immediately.
    pub fn start(&mut self, period: Duration) {
        if self.handle.is_some() {
            warn!("Scheduler already started");
            return;
        }

        let (tx, rx) = watch::channel(false);
        let ingestor = self.ingestor.clone();
        let running = Arc::clone(&self.running);

        self.handle = Some(tokio::spawn(run_loop(ingestor, running, period, rx)));
        self.shutdown = Some(tx);
    }

    /// Run one ingestion now, unless one is already in progress.
    pub async fn trigger(&self) -> RunOutcome {
        match RunPermit::acquire(&self.running) {
            Some(permit) => execute(&self.ingestor, permit).await,
            None => {
                warn!("Ingestion already in progress, skipping on-demand trigger");
                RunOutcome::Skipped
            }
        }
    }

    /// Stop the timer and wait for a scheduled run in flight to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
        }
    }
}

async fn run_loop(
    ingestor: Ingestor,
    running: Arc<AtomicBool>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Scheduler started (interval: {} seconds)", period.as_secs_f64());

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            // A dropped sender counts as a stop request too.
            _ = shutdown.changed() => break,

            _ = timer.tick() => match RunPermit::acquire(&running) {
                Some(permit) => {
                    let ingestor = ingestor.clone();
                    runs.spawn(async move { execute(&ingestor, permit).await });
                }
                None => warn!("Previous ingestion run still in progress, skipping this trigger"),
            },

            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = joined {
                    error!("Ingestion task panicked: {}", e);
                }
            }
        }
    }

    if !runs.is_empty() {
        info!("Waiting for in-flight ingestion run to finish");
    }
    while let Some(joined) = runs.join_next().await {
        if let Err(e) = joined {
            error!("Ingestion task panicked: {}", e);
        }
    }

    info!("Scheduler stopped");
}

async fn execute(ingestor: &Ingestor, _permit: RunPermit) -> RunOutcome {
    debug!("Ingestion run started");
    match ingestor.run_once().await {
        Ok(summary) => RunOutcome::Completed(summary),
        Err(e) => {
            error!("Ingestion run failed: {}", e);
            RunOutcome::Failed(e.to_string())
        }
    }
}
