//! Applying PMS change events to the store
//!
//! Reservation events are handled here directly. Room, rate and
//! availability events go to a [`ChangeHandler`] registered for their type,
//! or fall under the [`UnsupportedEventPolicy`] when there is none.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{EventAction, EventType, PmsReservation, PmsSyncEvent};
use crate::storage::StoreTransaction;
use crate::sync::error::SyncError;

/// What happened to a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Reservation created or overwritten
    Upserted,
    /// Reservation removed
    Deleted,
    /// Delete for a reservation that was not stored locally
    AlreadyAbsent,
    /// Passed to a registered handler
    Handled,
    /// No handler for this type; skipped
    Unsupported(EventType),
}

/// What to do with events nobody handles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedEventPolicy {
    /// Log and carry on; the event still counts toward the pass
    #[default]
    Skip,
    /// Abort the whole batch
    Fail,
}

impl UnsupportedEventPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnsupportedEventPolicy::Skip => "skip",
            UnsupportedEventPolicy::Fail => "fail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "skip" => Some(UnsupportedEventPolicy::Skip),
            "fail" => Some(UnsupportedEventPolicy::Fail),
            _ => None,
        }
    }
}

/// Applies events of one non-reservation type
///
/// Runs inside the incremental pass transaction; returning an error rolls
/// back the whole batch.
pub trait ChangeHandler: Send + Sync {
    fn apply(&self, event: &PmsSyncEvent, tx: &mut dyn StoreTransaction) -> Result<(), SyncError>;
}

/// Routes events to the right writer
pub(crate) struct EventDispatcher {
    handlers: HashMap<EventType, Box<dyn ChangeHandler>>,
    policy: UnsupportedEventPolicy,
}

impl EventDispatcher {
    pub(crate) fn new(policy: UnsupportedEventPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            policy,
        }
    }

    pub(crate) fn set_policy(&mut self, policy: UnsupportedEventPolicy) {
        self.policy = policy;
    }

    /// Register a handler for a non-reservation event type
    ///
    /// Reservation events always use the built-in mapping; returns `false`
    /// and registers nothing for them.
    pub(crate) fn register(&mut self, event_type: EventType, handler: Box<dyn ChangeHandler>) -> bool {
        if event_type == EventType::Reservation {
            warn!("Ignoring handler registration for reservation events");
            return false;
        }
        self.handlers.insert(event_type, handler);
        true
    }

    pub(crate) fn dispatch(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &PmsSyncEvent,
        synced_at: DateTime<Utc>,
    ) -> Result<EventOutcome, SyncError> {
        if event.event_type == EventType::Reservation {
            return apply_reservation_event(tx, event, synced_at);
        }

        if let Some(handler) = self.handlers.get(&event.event_type) {
            handler.apply(event, tx)?;
            return Ok(EventOutcome::Handled);
        }

        match self.policy {
            UnsupportedEventPolicy::Skip => {
                warn!(
                    "Skipping {} {} event for '{}': no handler registered",
                    event.event_type, event.action, event.entity_id
                );
                Ok(EventOutcome::Unsupported(event.event_type))
            }
            UnsupportedEventPolicy::Fail => Err(SyncError::UnsupportedEvent {
                event_type: event.event_type,
                action: event.action,
                entity_id: event.entity_id.clone(),
            }),
        }
    }
}

fn apply_reservation_event(
    tx: &mut dyn StoreTransaction,
    event: &PmsSyncEvent,
    synced_at: DateTime<Utc>,
) -> Result<EventOutcome, SyncError> {
    match event.action {
        EventAction::Create | EventAction::Update => {
            let reservation = decode_reservation(event)?;
            if reservation.pms_id.trim() != event.entity_id.trim() {
                debug!(
                    "Event entity '{}' carries reservation '{}'; using the payload id",
                    event.entity_id, reservation.pms_id
                );
            }
            tx.upsert_reservation(&reservation.to_local(synced_at))?;
            Ok(EventOutcome::Upserted)
        }
        EventAction::Delete => {
            if tx.delete_reservation(event.entity_id.trim())? {
                Ok(EventOutcome::Deleted)
            } else {
                debug!("Reservation {} already absent", event.entity_id);
                Ok(EventOutcome::AlreadyAbsent)
            }
        }
    }
}

/// Decode a reservation payload, filling `pmsId` from the event when missing
fn decode_reservation(event: &PmsSyncEvent) -> Result<PmsReservation, SyncError> {
    let mut payload = event.payload.clone();
    if let Some(fields) = payload.as_object_mut() {
        if !fields.contains_key("pmsId") {
            fields.insert(
                "pmsId".to_string(),
                serde_json::Value::String(event.entity_id.clone()),
            );
        }
    }

    serde_json::from_value(payload).map_err(|source| SyncError::InvalidPayload {
        event_type: event.event_type,
        entity_id: event.entity_id.clone(),
        source,
    })
}
