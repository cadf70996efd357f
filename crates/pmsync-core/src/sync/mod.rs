//! Reconciliation engine
//!
//! ## Architecture
//!
//! - **plan**: pure diff of a PMS snapshot against local reservations
//! - **dispatch**: applies individual change events inside a transaction
//! - **reconciler**: full and incremental passes over an injected
//!   `PmsClient` and `ReservationStore`
//! - **scheduler**: one full sync at start, then incremental syncs on a
//!   fixed interval
//!
//! The PMS is authoritative. Every pass either commits all of its writes
//! together with a sync log entry, or commits nothing.

pub mod dispatch;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod scheduler;

pub use dispatch::{ChangeHandler, EventOutcome, UnsupportedEventPolicy};
pub use error::SyncError;
pub use plan::{plan_full_sync, SyncPlan};
pub use reconciler::{ErrorHandler, FullSyncReport, IncrementalSyncReport, Reconciler};
pub use scheduler::{RetryPolicy, SchedulerStatus, SyncScheduler};
