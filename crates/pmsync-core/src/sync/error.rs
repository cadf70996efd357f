//! Errors raised by a sync pass

use thiserror::Error;

use crate::models::{EventAction, EventType};
use crate::pms::PmsError;
use crate::storage::StoreError;

/// Why a sync pass failed
///
/// Any of these aborts the pass; nothing from it is committed.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The PMS could not be read
    #[error("Failed to fetch from PMS: {0}")]
    Fetch(#[from] PmsError),

    /// The local store rejected a read or the transaction
    #[error("Store transaction failed: {0}")]
    Store(#[from] StoreError),

    /// No handler is registered for this event and the policy is `fail`
    #[error("No handler for {event_type} {action} event on '{entity_id}'")]
    UnsupportedEvent {
        event_type: EventType,
        action: EventAction,
        entity_id: String,
    },

    /// The event payload could not be decoded
    #[error("Invalid payload for {event_type} event '{entity_id}': {source}")]
    InvalidPayload {
        event_type: EventType,
        entity_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    /// Whether retrying the same pass soon could succeed
    ///
    /// Only PMS failures qualify; the scheduler's retry policy uses this.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Fetch(e) => e.is_transient(),
            SyncError::Store(_)
            | SyncError::UnsupportedEvent { .. }
            | SyncError::InvalidPayload { .. } => false,
        }
    }

    /// Short category name for logs and reports
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Fetch(_) => "fetch",
            SyncError::Store(_) => "transaction",
            SyncError::UnsupportedEvent { .. } => "unsupported_event",
            SyncError::InvalidPayload { .. } => "invalid_payload",
        }
    }
}
