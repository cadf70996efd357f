//! Periodic sync driver
//!
//! `start()` runs one full sync, then a background task runs an
//! incremental sync every `sync_interval`. The first tick fires one full
//! interval after start. `stop()` shuts the task down and waits for any
//! pass in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::pms::PmsClient;
use crate::storage::ReservationStore;
use crate::sync::error::SyncError;
use crate::sync::reconciler::Reconciler;

/// What the scheduler is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    Stopped,
    /// Running, waiting for the next tick
    Idle,
    FullSync,
    IncrementalSync,
}

impl SchedulerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerStatus::Stopped => "stopped",
            SchedulerStatus::Idle => "idle",
            SchedulerStatus::FullSync => "full_sync",
            SchedulerStatus::IncrementalSync => "incremental_sync",
        }
    }
}

/// Retry behaviour for failed incremental passes
///
/// Only transient fetch failures are retried. With `max_retries` at zero a
/// failed pass waits for the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn should_retry(&self, error: &SyncError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

/// Commands sent to the scheduler task
#[derive(Debug)]
enum SchedulerCommand {
    Shutdown,
}

struct RunningTask {
    command_tx: mpsc::Sender<SchedulerCommand>,
    handle: JoinHandle<()>,
}

pub struct SyncScheduler<C, S> {
    reconciler: Arc<Reconciler<C, S>>,
    retry: RetryPolicy,
    running: Mutex<Option<RunningTask>>,
    status_tx: Arc<watch::Sender<SchedulerStatus>>,
    status_rx: watch::Receiver<SchedulerStatus>,
}

impl<C, S> SyncScheduler<C, S>
where
    C: PmsClient + 'static,
    S: ReservationStore + 'static,
{
    pub fn new(reconciler: Arc<Reconciler<C, S>>) -> Self {
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::Stopped);
        Self {
            reconciler,
            retry: RetryPolicy::default(),
            running: Mutex::new(None),
            status_tx: Arc::new(status_tx),
            status_rx,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn reconciler(&self) -> &Arc<Reconciler<C, S>> {
        &self.reconciler
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.status_rx.borrow()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run a full sync, then start periodic incremental syncs
    ///
    /// Returns `false` without doing anything if already running. A failed
    /// full sync goes to the reconciler's error handler and does not prevent
    /// the schedule from starting.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("Sync scheduler already running");
            return false;
        }

        self.status_tx.send_replace(SchedulerStatus::FullSync);
        if self.reconciler.full_sync().await.is_err() {
            warn!("Initial full sync failed; continuing with incremental syncs");
        }

        let mut period = self.reconciler.config().sync_interval;
        if period.is_zero() {
            warn!("Sync interval is zero; using 1s");
            period = Duration::from_secs(1);
        }

        let (command_tx, command_rx) = mpsc::channel(4);
        let handle = tokio::spawn(scheduler_task(
            self.reconciler.clone(),
            self.retry.clone(),
            Instant::now() + period,
            period,
            command_rx,
            self.status_tx.clone(),
        ));

        self.status_tx.send_replace(SchedulerStatus::Idle);
        *running = Some(RunningTask { command_tx, handle });
        info!("Sync scheduler started (every {:?})", period);
        true
    }

    /// Stop periodic syncing
    ///
    /// Waits for an in-flight pass to finish. Returns `false` if the
    /// scheduler was not running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(task) = running.take() else {
            return false;
        };

        let _ = task.command_tx.send(SchedulerCommand::Shutdown).await;
        if let Err(e) = task.handle.await {
            warn!("Sync scheduler task ended abnormally: {}", e);
        }

        self.status_tx.send_replace(SchedulerStatus::Stopped);
        info!("Sync scheduler stopped");
        true
    }
}

async fn scheduler_task<C, S>(
    reconciler: Arc<Reconciler<C, S>>,
    retry: RetryPolicy,
    first_tick: Instant,
    period: Duration,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
    status_tx: Arc<watch::Sender<SchedulerStatus>>,
) where
    C: PmsClient,
    S: ReservationStore,
{
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = command_rx.recv() => {
                if matches!(cmd, Some(SchedulerCommand::Shutdown) | None) {
                    break;
                }
            }
            _ = ticker.tick() => {
                status_tx.send_replace(SchedulerStatus::IncrementalSync);
                let shutdown = incremental_with_retry(&reconciler, &retry, &mut command_rx).await;
                status_tx.send_replace(SchedulerStatus::Idle);
                if shutdown {
                    break;
                }
            }
        }
    }

    debug!("Sync scheduler task exiting");
}

/// Run one incremental pass, retrying per `retry`
///
/// Returns `true` if a shutdown arrived while waiting to retry.
async fn incremental_with_retry<C, S>(
    reconciler: &Reconciler<C, S>,
    retry: &RetryPolicy,
    command_rx: &mut mpsc::Receiver<SchedulerCommand>,
) -> bool
where
    C: PmsClient,
    S: ReservationStore,
{
    let mut attempt = 0;
    let mut delay = retry.initial_delay;

    loop {
        let error = match reconciler.incremental_sync().await {
            Ok(_) => return false,
            Err(e) => e,
        };

        if !retry.should_retry(&error, attempt) {
            return false;
        }
        attempt += 1;
        info!(
            "Retrying incremental sync in {:?} (attempt {}/{})",
            delay, attempt, retry.max_retries
        );

        tokio::select! {
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(SchedulerCommand::Shutdown) | None) {
                    return true;
                }
            }
            _ = tokio::time::sleep(delay) => {
                delay = (delay * 2).min(retry.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pms::PmsError;
    use crate::storage::SqliteStore;
    use crate::test_support::{pms_config, ScriptedPmsClient};

    const PERIOD: Duration = Duration::from_secs(60);

    type TestScheduler = SyncScheduler<Arc<ScriptedPmsClient>, SqliteStore>;

    fn scheduler(client: &Arc<ScriptedPmsClient>) -> TestScheduler {
        let mut config = pms_config();
        config.sync_interval = PERIOD;
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        SyncScheduler::new(Arc::new(Reconciler::new(config, client.clone(), store)))
    }

    async fn advance(by: Duration) {
        tokio::time::sleep(by).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_full_sync_then_ticks() {
        let client = Arc::new(ScriptedPmsClient::new());
        let scheduler = scheduler(&client);

        assert!(scheduler.start().await);
        assert_eq!(client.snapshot_calls(), 1);
        assert_eq!(client.change_calls(), 0);
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);

        advance(PERIOD / 2).await;
        assert_eq!(client.change_calls(), 0);

        advance(PERIOD * 3).await;
        assert_eq!(client.change_calls(), 3);
        assert_eq!(client.snapshot_calls(), 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_noop() {
        let client = Arc::new(ScriptedPmsClient::new());
        let scheduler = scheduler(&client);

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert_eq!(client.snapshot_calls(), 1);

        advance(PERIOD + Duration::from_millis(10)).await;
        assert_eq!(client.change_calls(), 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks_and_is_idempotent() {
        let client = Arc::new(ScriptedPmsClient::new());
        let scheduler = scheduler(&client);

        assert!(!scheduler.stop().await);

        scheduler.start().await;
        advance(PERIOD + Duration::from_millis(10)).await;
        assert_eq!(client.change_calls(), 1);

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!scheduler.is_running().await);
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);

        advance(PERIOD * 5).await;
        assert_eq!(client.change_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_runs_full_sync_again() {
        let client = Arc::new(ScriptedPmsClient::new());
        let scheduler = scheduler(&client);

        scheduler.start().await;
        scheduler.stop().await;
        assert!(scheduler.start().await);

        assert_eq!(client.snapshot_calls(), 2);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_full_sync_still_schedules() {
        let client = Arc::new(ScriptedPmsClient::new());
        client.fail_snapshot(PmsError::unauthorized("bad key"));
        let scheduler = scheduler(&client);

        assert!(scheduler.start().await);
        assert!(scheduler.is_running().await);

        advance(PERIOD + Duration::from_millis(10)).await;
        assert_eq!(client.change_calls(), 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_pass_in_flight() {
        let client = Arc::new(ScriptedPmsClient::new().with_latency(Duration::from_secs(5)));
        let scheduler = scheduler(&client);

        scheduler.start().await;
        // Land inside the incremental fetch
        advance(PERIOD + Duration::from_secs(1)).await;
        assert_eq!(scheduler.status(), SchedulerStatus::IncrementalSync);

        scheduler.stop().await;

        let logs = scheduler.reconciler().store().list_sync_logs(10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let client = Arc::new(ScriptedPmsClient::new());
        client.push_changes(Err(PmsError::network("reset")));
        client.push_changes(Err(PmsError::network("reset")));
        let scheduler = scheduler(&client).with_retry_policy(RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        });

        scheduler.start().await;
        // First attempt at PERIOD, retries at +1s and +3s
        advance(PERIOD + Duration::from_secs(4)).await;

        assert_eq!(client.change_calls(), 3);
        let latest = scheduler
            .reconciler()
            .store()
            .find_latest_sync_log()
            .unwrap()
            .unwrap();
        assert_eq!(latest.kind, crate::models::SyncKind::Incremental);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_waits_for_next_tick() {
        let client = Arc::new(ScriptedPmsClient::new());
        client.push_changes(Err(PmsError::unauthorized("revoked")));
        let scheduler = scheduler(&client).with_retry_policy(RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        });

        scheduler.start().await;
        advance(PERIOD + Duration::from_secs(10)).await;
        assert_eq!(client.change_calls(), 1);

        advance(PERIOD).await;
        assert_eq!(client.change_calls(), 2);

        scheduler.stop().await;
    }

    #[test]
    fn test_retry_policy_only_retries_transient_fetches() {
        let policy = RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::default()
        };
        let transient = SyncError::Fetch(PmsError::network("x"));
        let permanent = SyncError::Fetch(PmsError::unauthorized("x"));

        assert!(policy.should_retry(&transient, 0));
        assert!(!policy.should_retry(&transient, 1));
        assert!(!policy.should_retry(&permanent, 0));
        let store = SyncError::Store(crate::storage::StoreError::InvalidData {
            column: "pms_id",
            value: "x".to_string(),
        });
        assert!(!policy.should_retry(&store, 0));
        assert!(!RetryPolicy::default().should_retry(&transient, 0));
    }
}
