//! Batch driver and background scheduler.
//!
//! [`run_due_batch`] claims due subscriptions and syncs them with bounded
//! concurrency. [`Scheduler`] calls a batch function on a fixed tick and
//! accepts commands through a [`SchedulerHandle`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use icaltester_fetch::HttpTransport;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::store::SyncStore;

/// Summary of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<SyncOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<SyncOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }
}

/// Claims up to `config.batch_size` subscriptions due at `now` and syncs them.
///
/// At most `config.concurrency` syncs run at once. A failed sync counts in
/// `failed` and never aborts the batch.
///
/// # Errors
///
/// Returns `Persistence` if claiming fails; nothing is synced in that case.
pub async fn run_due_batch<S, T>(
    orchestrator: &SyncOrchestrator<S, T>,
    config: &SyncConfig,
    now: DateTime<Utc>,
) -> Result<BatchReport, SyncError>
where
    S: SyncStore,
    T: HttpTransport,
{
    let claimed = orchestrator
        .store()
        .claim_due_subscriptions(now, config.batch_size, config.claim_lease)
        .await?;
    if claimed.is_empty() {
        debug!("No subscriptions due");
        return Ok(BatchReport::default());
    }

    let outcomes: Vec<SyncOutcome> = stream::iter(claimed)
        .map(|subscription| async move { orchestrator.sync(&subscription).await })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let report = BatchReport::from_outcomes(outcomes);
    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "Batch finished"
    );
    Ok(report)
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerCommand {
    /// Run a batch now.
    SyncNow,
    /// Skip ticks until resumed.
    Pause,
    /// Resume ticking.
    Resume,
    /// Stop the scheduler.
    Stop,
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Whether the scheduler is paused.
    pub paused: bool,
    /// Number of batches run.
    pub batches: u64,
    /// When the last batch finished.
    pub last_run: Option<DateTime<Utc>>,
    /// Report of the last successful batch.
    pub last_report: Option<BatchReport>,
    /// Error of the last batch, if it failed.
    pub last_error: Option<String>,
}

impl SchedulerState {
    /// Records a finished batch.
    pub fn record_success(&mut self, report: BatchReport) {
        self.batches += 1;
        self.last_run = Some(Utc::now());
        self.last_report = Some(report);
        self.last_error = None;
    }

    /// Records a batch that could not run.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.batches += 1;
        self.last_run = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Runs a batch function on a fixed tick.
pub struct Scheduler {
    tick_interval: Duration,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    /// Creates a scheduler ticking every `tick_interval`.
    pub fn new(tick_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            tick_interval,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs until stopped, calling `batch_fn` once at start and on every tick.
    pub async fn run<F, Fut>(self, batch_fn: F)
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<BatchReport, String>> + Send,
    {
        let Self {
            tick_interval,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Keep a sender alive so `recv` only yields `None` on explicit Stop.
        let _command_tx = command_tx;

        info!(tick_secs = tick_interval.as_secs(), "Scheduler started");
        run_batch(&state, &batch_fn).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(tick_interval) => {
                    if state.read().await.paused {
                        debug!("Scheduler paused, skipping batch");
                        continue;
                    }
                    run_batch(&state, &batch_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::SyncNow) => {
                            debug!("Received SyncNow command");
                            run_batch(&state, &batch_fn).await;
                        }
                        Some(SchedulerCommand::Pause) => {
                            info!("Scheduler paused");
                            state.write().await.paused = true;
                        }
                        Some(SchedulerCommand::Resume) => {
                            info!("Scheduler resumed");
                            state.write().await.paused = false;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn run_batch<F, Fut>(state: &SharedSchedulerState, batch_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<BatchReport, String>>,
{
    match batch_fn().await {
        Ok(report) => state.write().await.record_success(report),
        Err(e) => {
            warn!(error = %e, "Batch failed");
            state.write().await.record_failure(e);
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Triggers an immediate batch.
    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::SyncNow).await
    }

    /// Pauses the scheduler.
    pub async fn pause(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Pause).await
    }

    /// Resumes the scheduler.
    pub async fn resume(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Resume).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns the current scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    /// Returns true if the scheduler is paused.
    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::SyncStatus;
    use crate::testing::{StubResponse, StubTransport, subscription};
    use icaltester_fetch::{FetchGuard, FetchLimits};
    use std::sync::atomic::{AtomicU32, Ordering};

    const CAL: &str = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\nDTSTART:20250101\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    fn url(n: usize) -> String {
        format!("https://feeds.example.com/{n}.ics")
    }

    async fn orchestrator_with(
        count: usize,
        transport: StubTransport,
    ) -> SyncOrchestrator<MemoryStore, StubTransport> {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for n in 0..count {
            let mut sub = subscription(&format!("s{n}"), &url(n));
            sub.next_due_at = Some(now - chrono::Duration::seconds(1_000 - n as i64));
            store.put_subscription(sub).await;
        }
        SyncOrchestrator::new(
            store,
            FetchGuard::with_transport(transport, FetchLimits::default()),
        )
    }

    #[tokio::test]
    async fn batch_is_capped_and_ordered() {
        let mut transport = StubTransport::new();
        for n in 0..5 {
            transport = transport.route(&url(n), StubResponse::ok(CAL));
        }
        let orchestrator = orchestrator_with(5, transport).await;
        let config = SyncConfig::default().with_batch_size(3).with_concurrency(2);

        let report = run_due_batch(&orchestrator, &config, Utc::now()).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 3);
        let mut ids: Vec<_> = report.outcomes.iter().map(|o| o.subscription_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, ["s0", "s1", "s2"]);

        let rest = run_due_batch(&orchestrator, &config, Utc::now()).await.unwrap();
        assert_eq!(rest.processed, 2);
        let empty = run_due_batch(&orchestrator, &config, Utc::now()).await.unwrap();
        assert_eq!(empty, BatchReport::default());
    }

    #[tokio::test]
    async fn failures_do_not_abort_batch() {
        let transport = StubTransport::new()
            .route(&url(0), StubResponse::ok(CAL))
            .route(&url(1), StubResponse::status(503, ""));
        let orchestrator = orchestrator_with(3, transport).await;

        let report = run_due_batch(&orchestrator, &SyncConfig::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);

        let logs = orchestrator.store().snapshot().await.sync_logs;
        assert_eq!(logs.len(), 3);
        assert_eq!(
            logs.iter().filter(|l| l.status == SyncStatus::Error).count(),
            2
        );
    }

    #[tokio::test]
    async fn synced_subscriptions_are_rescheduled_past_lease() {
        let transport = StubTransport::new().route(&url(0), StubResponse::ok(CAL));
        let orchestrator = orchestrator_with(1, transport).await;
        let before = Utc::now();

        run_due_batch(&orchestrator, &SyncConfig::default(), before)
            .await
            .unwrap();

        let sub = orchestrator.store().get_subscription("s0").await.unwrap().unwrap();
        let next = sub.next_due_at.unwrap();
        assert!(next >= before + chrono::Duration::seconds(600));
        assert!(!sub.is_due(Utc::now()));
    }

    #[tokio::test]
    async fn manual_subscriptions_are_never_claimed() {
        let orchestrator = orchestrator_with(0, StubTransport::new()).await;
        let sub = subscription("manual", &url(9)).with_poll_interval(0);
        orchestrator.store().put_subscription(sub).await;

        let report = run_due_batch(&orchestrator, &SyncConfig::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);

        let outcome = orchestrator.sync_subscription("manual").await.unwrap();
        assert!(!outcome.is_success());
        let stored = orchestrator.store().get_subscription("manual").await.unwrap().unwrap();
        assert_eq!(stored.next_due_at, stored.last_synced_at);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_commands() {
        let scheduler = Scheduler::new(Duration::from_secs(60));
        let handle = scheduler.handle();

        let runs = Arc::new(AtomicU32::new(0));
        let runs_clone = runs.clone();

        let task = tokio::spawn(async move {
            scheduler
                .run(move || {
                    let runs = runs_clone.clone();
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(BatchReport::default())
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_paused().await);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_paused().await);
        assert_eq!(handle.state().await.batches, 3);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn scheduler_records_batch_errors() {
        let scheduler = Scheduler::new(Duration::from_secs(3600));
        let handle = scheduler.handle();

        let task = tokio::spawn(scheduler.run(|| async { Err("store offline".to_string()) }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = handle.state().await;
        assert_eq!(state.last_error.as_deref(), Some("store offline"));
        assert!(state.last_report.is_none());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }
}
