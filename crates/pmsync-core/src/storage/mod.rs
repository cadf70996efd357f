//! Storage layer
//!
//! Holds the local projection of PMS reservations and the sync history.
//!
//! ## Architecture
//!
//! - **traits**: `ReservationStore` / `StoreTransaction`, the contract the
//!   reconciler writes through
//! - **sqlite**: the SQLite implementation used by the CLI and tests
//!
//! All reconciler writes happen inside `run_in_transaction`, so a failed
//! pass never leaves partial state behind.

pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;
pub use traits::{ReservationStore, StoreTransaction};
