//! pmsync core library
//!
//! Keeps a local store of hotel reservations consistent with an external
//! Property Management System (PMS). The PMS is the source of truth; this
//! crate pulls from it and reconciles.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(SqliteStore::open_with_config(&config)?);
//! let pms = config.pms_config()?;
//! let client = HttpPmsClient::new(pms.clone())?;
//!
//! let reconciler = Arc::new(Reconciler::new(pms, client, store));
//! let scheduler = SyncScheduler::new(reconciler).with_retry_policy(config.retry_policy());
//! scheduler.start().await;
//! ```
//!
//! # Modules
//!
//! - `models`: reservations, sync logs and PMS change events
//! - `storage`: the reservation store contract and its SQLite implementation
//! - `pms`: the PMS client contract and an HTTP adapter
//! - `sync`: reconciler and scheduler
//! - `config`: application configuration

pub mod config;
pub mod models;
pub mod pms;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Config, PmsConfig, PmsProvider};
pub use models::{
    EventAction, EventType, PaymentStatus, PmsReservation, PmsSyncEvent, Reservation,
    ReservationStatus, SyncKind, SyncLog,
};
pub use pms::{HttpPmsClient, PmsClient, PmsError, PmsErrorCode};
pub use storage::{ReservationStore, SqliteStore, StoreError, StoreTransaction};
pub use sync::{
    FullSyncReport, IncrementalSyncReport, Reconciler, RetryPolicy, SchedulerStatus, SyncError,
    SyncScheduler, UnsupportedEventPolicy,
};
