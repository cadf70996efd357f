//! Reconciliation passes
//!
//! The reconciler owns the write path for PMS-sourced data. Each pass reads
//! from the injected [`PmsClient`], diffs or replays against the store, and
//! commits everything (including its sync log entry) in one transaction.
//! Passes on the same reconciler never overlap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::PmsConfig;
use crate::models::{EventType, NewSyncLog, SyncKind, SyncLog};
use crate::pms::PmsClient;
use crate::storage::ReservationStore;
use crate::sync::dispatch::{ChangeHandler, EventDispatcher, EventOutcome, UnsupportedEventPolicy};
use crate::sync::error::SyncError;
use crate::sync::plan::plan_full_sync;

/// Receives every error a pass produces
pub type ErrorHandler = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// Outcome of a committed full sync
#[derive(Debug, Clone, Serialize)]
pub struct FullSyncReport {
    pub created: usize,
    pub updated: usize,
    /// Updates that rewrote identical content
    pub unchanged: usize,
    pub deleted: usize,
    pub log: SyncLog,
}

impl FullSyncReport {
    pub fn change_count(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Outcome of a committed incremental sync
#[derive(Debug, Clone, Serialize)]
pub struct IncrementalSyncReport {
    /// Timestamp the changes were requested from
    pub since: Option<DateTime<Utc>>,
    pub events: usize,
    pub upserted: usize,
    pub deleted: usize,
    pub already_absent: usize,
    pub handled: usize,
    pub unsupported: usize,
    pub log: SyncLog,
}

pub struct Reconciler<C, S> {
    config: PmsConfig,
    client: C,
    store: Arc<S>,
    dispatcher: EventDispatcher,
    error_handler: ErrorHandler,
    pass_lock: Mutex<()>,
}

impl<C: PmsClient, S: ReservationStore> Reconciler<C, S> {
    pub fn new(config: PmsConfig, client: C, store: Arc<S>) -> Self {
        Self {
            config,
            client,
            store,
            dispatcher: EventDispatcher::new(UnsupportedEventPolicy::default()),
            error_handler: Arc::new(log_sync_error),
            pass_lock: Mutex::new(()),
        }
    }

    /// Replace the default handler, which logs through `tracing`
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SyncError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    pub fn with_unsupported_policy(mut self, policy: UnsupportedEventPolicy) -> Self {
        self.dispatcher.set_policy(policy);
        self
    }

    /// Handle room, rate or availability events
    ///
    /// Registrations for reservation events are ignored.
    pub fn with_handler<H>(mut self, event_type: EventType, handler: H) -> Self
    where
        H: ChangeHandler + 'static,
    {
        self.dispatcher.register(event_type, Box::new(handler));
        self
    }

    pub fn config(&self) -> &PmsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Make the local set equal the PMS snapshot
    ///
    /// Creates what is new, overwrites what exists on both sides and deletes
    /// what the PMS no longer reports. Errors are passed to the error handler
    /// and returned; on error nothing is committed.
    pub async fn full_sync(&self) -> Result<FullSyncReport, SyncError> {
        let _pass = self.pass_lock.lock().await;
        let result = self.run_full_sync().await;
        self.report_failure(result)
    }

    /// Replay changes since the last successful pass
    ///
    /// Errors are passed to the error handler and returned; on error nothing
    /// is committed and the cursor does not move.
    pub async fn incremental_sync(&self) -> Result<IncrementalSyncReport, SyncError> {
        let _pass = self.pass_lock.lock().await;
        let result = self.run_incremental_sync().await;
        self.report_failure(result)
    }

    async fn run_full_sync(&self) -> Result<FullSyncReport, SyncError> {
        let started_at = Utc::now();
        info!(
            "Starting full sync for hotel {} ({})",
            self.config.hotel_id, self.config.provider.name
        );

        let remote = self.client.fetch_all_reservations().await?;
        let local = self.store.list_reservations()?;
        debug!(
            "Fetched {} remote reservations, {} local",
            remote.len(),
            local.len()
        );

        let plan = plan_full_sync(remote, local);
        let synced_at = Utc::now();

        let report = self.store.run_in_transaction(|tx| {
            for reservation in &plan.to_create {
                tx.create_reservation(&reservation.to_local(synced_at))?;
            }

            let mut unchanged = 0;
            for (remote, existing) in &plan.to_update {
                let fields = remote.to_local(synced_at);
                if existing.same_content(&fields) {
                    unchanged += 1;
                }
                tx.update_reservation(&fields)?;
            }

            for reservation in &plan.to_delete {
                tx.delete_reservation(&reservation.pms_id)?;
            }

            let log = tx.create_sync_log(&NewSyncLog::success(
                SyncKind::Full,
                started_at,
                count(plan.change_count()),
            ))?;

            Ok::<_, SyncError>(FullSyncReport {
                created: plan.to_create.len(),
                updated: plan.to_update.len(),
                unchanged,
                deleted: plan.to_delete.len(),
                log,
            })
        })?;

        info!(
            "Full sync complete: {} created, {} updated, {} deleted",
            report.created, report.updated, report.deleted
        );
        Ok(report)
    }

    async fn run_incremental_sync(&self) -> Result<IncrementalSyncReport, SyncError> {
        // The next cursor must not be later than the fetch
        let started_at = Utc::now();
        let since = self.store.find_latest_sync_log()?.map(|log| log.timestamp);
        match since {
            Some(ts) => debug!("Fetching PMS changes since {}", ts.to_rfc3339()),
            None => debug!("No previous sync; fetching all PMS changes"),
        }

        let events = self.client.fetch_changes_since(since).await?;
        let synced_at = Utc::now();

        let report = self.store.run_in_transaction(|tx| {
            let mut tally = Tally::default();
            for event in &events {
                tally.record(self.dispatcher.dispatch(tx, event, synced_at)?);
            }

            let log = tx.create_sync_log(&NewSyncLog::success(
                SyncKind::Incremental,
                started_at,
                count(events.len()),
            ))?;

            Ok::<_, SyncError>(IncrementalSyncReport {
                since,
                events: events.len(),
                upserted: tally.upserted,
                deleted: tally.deleted,
                already_absent: tally.already_absent,
                handled: tally.handled,
                unsupported: tally.unsupported,
                log,
            })
        })?;

        if report.events > 0 {
            info!("Incremental sync applied {} changes", report.events);
        } else {
            debug!("Incremental sync found no changes");
        }
        Ok(report)
    }

    fn report_failure<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(e) = &result {
            (self.error_handler)(e);
        }
        result
    }
}

fn log_sync_error(e: &SyncError) {
    error!("Sync pass failed ({}): {}", e.category(), e);
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[derive(Default)]
struct Tally {
    upserted: usize,
    deleted: usize,
    already_absent: usize,
    handled: usize,
    unsupported: usize,
}

impl Tally {
    fn record(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Upserted => self.upserted += 1,
            EventOutcome::Deleted => self.deleted += 1,
            EventOutcome::AlreadyAbsent => self.already_absent += 1,
            EventOutcome::Handled => self.handled += 1,
            EventOutcome::Unsupported(_) => self.unsupported += 1,
        }
    }
}
