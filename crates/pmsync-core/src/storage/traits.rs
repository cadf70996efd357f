//! Contracts for the local reservation store
//!
//! The reconciler is the only writer of PMS-sourced fields; everything it
//! writes goes through a `StoreTransaction` handed out by
//! `ReservationStore::run_in_transaction`.

use crate::models::{NewReservation, NewSyncLog, Reservation, SyncLog};
use crate::storage::error::{StoreError, StoreResult};

/// Read access plus transactional writes over reservations and sync logs
pub trait ReservationStore: Send + Sync {
    /// All local reservations
    fn list_reservations(&self) -> StoreResult<Vec<Reservation>>;

    /// Look up a reservation by its PMS id
    fn get_reservation(&self, pms_id: &str) -> StoreResult<Option<Reservation>>;

    /// Number of local reservations
    fn reservation_count(&self) -> StoreResult<i64>;

    /// Most recent successful sync log, by timestamp
    fn find_latest_sync_log(&self) -> StoreResult<Option<SyncLog>>;

    /// Recent sync logs, newest first
    fn list_sync_logs(&self, limit: usize) -> StoreResult<Vec<SyncLog>>;

    /// Run `f` inside a single transaction
    ///
    /// Commits when `f` returns `Ok`; otherwise nothing `f` wrote is kept.
    fn run_in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>;
}

/// Writes available inside a transaction
pub trait StoreTransaction {
    /// Insert a reservation; fails if the PMS id already exists
    fn create_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation>;

    /// Overwrite all mapped fields of an existing reservation
    fn update_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation>;

    /// Create if absent, otherwise overwrite
    fn upsert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation>;

    /// Delete by PMS id. Returns `false` when there was nothing to delete.
    fn delete_reservation(&mut self, pms_id: &str) -> StoreResult<bool>;

    /// Append a sync log entry
    fn create_sync_log(&mut self, log: &NewSyncLog) -> StoreResult<SyncLog>;
}
