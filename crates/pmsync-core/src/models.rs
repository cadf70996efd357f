//! Data models for pmsync
//!
//! Defines the records exchanged with the PMS (`PmsReservation`,
//! `PmsSyncEvent`) and the local projection kept in the store
//! (`Reservation`, `SyncLog`).
//!
//! Remote shapes use the PMS wire naming (camelCase); local records are
//! only ever written by the reconciler.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation lifecycle status as reported by the PMS
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    CheckedIn,
    CheckedOut,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
        }
    }

    /// Parse the stored text form
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "checked_in" => Some(ReservationStatus::CheckedIn),
            "checked_out" => Some(ReservationStatus::CheckedOut),
            _ => None,
        }
    }
}

/// Payment state of a reservation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// A reservation as delivered by the PMS
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PmsReservation {
    /// External identifier, the join key between systems
    pub pms_id: String,
    pub guest_name: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub room_number: String,
    pub status: ReservationStatus,
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl PmsReservation {
    /// Map to the local projection, stamping it with `synced_at`
    ///
    /// Guest name and room number are trimmed; blank special requests
    /// are dropped. Timestamps are cut to whole milliseconds, the precision
    /// the store keeps.
    pub fn to_local(&self, synced_at: DateTime<Utc>) -> NewReservation {
        NewReservation {
            pms_id: self.pms_id.trim().to_string(),
            guest_name: self.guest_name.trim().to_string(),
            check_in: self.check_in.trunc_subsecs(3),
            check_out: self.check_out.trunc_subsecs(3),
            room_number: self.room_number.trim().to_string(),
            status: self.status,
            adults: self.adults,
            children: self.children,
            total_amount: self.total_amount,
            payment_status: self.payment_status,
            special_requests: self
                .special_requests
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            last_synced_at: synced_at.trunc_subsecs(3),
        }
    }
}

/// Field values written to the store for a reservation
///
/// The local id is owned by the store and never part of a write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReservation {
    pub pms_id: String,
    pub guest_name: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub room_number: String,
    pub status: ReservationStatus,
    pub adults: u32,
    pub children: u32,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub special_requests: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

/// The reconciled local projection of a PMS reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    /// Local identifier, assigned once by the store
    pub id: Uuid,
    /// External PMS identifier (unique, immutable)
    pub pms_id: String,
    pub guest_name: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub room_number: String,
    pub status: ReservationStatus,
    pub adults: u32,
    pub children: u32,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub special_requests: Option<String>,
    /// When the reconciler last wrote this record
    pub last_synced_at: DateTime<Utc>,
}

impl Reservation {
    /// True when every PMS-sourced field matches `other`
    ///
    /// Ignores the local id and `last_synced_at`.
    pub fn same_content(&self, other: &NewReservation) -> bool {
        self.pms_id == other.pms_id
            && self.guest_name == other.guest_name
            && self.check_in == other.check_in
            && self.check_out == other.check_out
            && self.room_number == other.room_number
            && self.status == other.status
            && self.adults == other.adults
            && self.children == other.children
            && self.total_amount == other.total_amount
            && self.payment_status == other.payment_status
            && self.special_requests == other.special_requests
    }
}

/// Which kind of pass produced a sync log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Full,
    Incremental,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Full => "full",
            SyncKind::Incremental => "incremental",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(SyncKind::Full),
            "incremental" => Some(SyncKind::Incremental),
            _ => None,
        }
    }
}

/// Append-only audit record of a committed sync pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncLog {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: SyncKind,
    pub change_count: u32,
    pub success: bool,
}

/// A sync log entry waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLog {
    pub timestamp: DateTime<Utc>,
    pub kind: SyncKind,
    pub change_count: u32,
    pub success: bool,
}

impl NewSyncLog {
    /// A successful pass
    pub fn success(kind: SyncKind, timestamp: DateTime<Utc>, change_count: u32) -> Self {
        Self {
            timestamp,
            kind,
            change_count,
            success: true,
        }
    }
}

/// Entity family a PMS change refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Reservation,
    Room,
    Rate,
    Availability,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Reservation => "reservation",
            EventType::Room => "room",
            EventType::Rate => "rate",
            EventType::Availability => "availability",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Create => "create",
            EventAction::Update => "update",
            EventAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of change received from the PMS
///
/// Consumed once per incremental pass; only the aggregate count is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PmsSyncEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub action: EventAction,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    /// Provider-specific body, opaque until dispatched
    #[serde(default)]
    pub payload: serde_json::Value,
}
