//! Test doubles and fixtures

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::config::{PmsConfig, PmsProvider};
use crate::models::{
    EventAction, EventType, NewReservation, NewSyncLog, PaymentStatus, PmsReservation,
    PmsSyncEvent, Reservation, ReservationStatus, SyncLog,
};
use crate::pms::{PmsClient, PmsError};
use crate::storage::{ReservationStore, SqliteStore, StoreError, StoreResult, StoreTransaction};

pub(crate) fn pms_config() -> PmsConfig {
    PmsConfig {
        provider: PmsProvider::default(),
        api_key: "test-key".to_string(),
        api_endpoint: "http://127.0.0.1:9".to_string(),
        hotel_id: "HOTEL-1".to_string(),
        sync_interval: Duration::from_secs(300),
        request_timeout: Duration::from_secs(5),
    }
}

pub(crate) fn pms_reservation(pms_id: &str, guest: &str) -> PmsReservation {
    PmsReservation {
        pms_id: pms_id.to_string(),
        guest_name: guest.to_string(),
        check_in: Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap(),
        check_out: Utc.with_ymd_and_hms(2025, 3, 4, 11, 0, 0).unwrap(),
        room_number: "204".to_string(),
        status: ReservationStatus::Confirmed,
        adults: 2,
        children: 0,
        total_amount: 420.0,
        payment_status: PaymentStatus::Pending,
        special_requests: None,
    }
}

pub(crate) fn local_reservation(pms_id: &str, guest: &str) -> Reservation {
    let fields = pms_reservation(pms_id, guest).to_local(Utc::now());
    Reservation {
        id: Uuid::new_v4(),
        pms_id: fields.pms_id,
        guest_name: fields.guest_name,
        check_in: fields.check_in,
        check_out: fields.check_out,
        room_number: fields.room_number,
        status: fields.status,
        adults: fields.adults,
        children: fields.children,
        total_amount: fields.total_amount,
        payment_status: fields.payment_status,
        special_requests: fields.special_requests,
        last_synced_at: fields.last_synced_at,
    }
}

pub(crate) fn reservation_event(action: EventAction, pms_id: &str, guest: &str) -> PmsSyncEvent {
    PmsSyncEvent {
        event_type: EventType::Reservation,
        action,
        entity_id: pms_id.to_string(),
        timestamp: Utc::now(),
        payload: serde_json::to_value(pms_reservation(pms_id, guest)).unwrap(),
    }
}

pub(crate) fn delete_event(pms_id: &str) -> PmsSyncEvent {
    PmsSyncEvent {
        event_type: EventType::Reservation,
        action: EventAction::Delete,
        entity_id: pms_id.to_string(),
        timestamp: Utc::now(),
        payload: serde_json::Value::Null,
    }
}

pub(crate) fn other_event(event_type: EventType, entity_id: &str) -> PmsSyncEvent {
    PmsSyncEvent {
        event_type,
        action: EventAction::Update,
        entity_id: entity_id.to_string(),
        timestamp: Utc::now(),
        payload: serde_json::json!({ "id": entity_id }),
    }
}

/// In-memory PMS with scripted responses and call accounting
#[derive(Default)]
pub(crate) struct ScriptedPmsClient {
    reservations: Mutex<Vec<PmsReservation>>,
    snapshot_error: Mutex<Option<PmsError>>,
    /// Consumed front to back; an empty queue answers with no changes
    changes: Mutex<VecDeque<Result<Vec<PmsSyncEvent>, PmsError>>>,
    cursors: Mutex<Vec<Option<DateTime<Utc>>>>,
    snapshot_calls: AtomicUsize,
    change_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedPmsClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long (on the tokio clock)
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn set_reservations(&self, reservations: Vec<PmsReservation>) {
        *self.reservations.lock().unwrap() = reservations;
    }

    pub(crate) fn fail_snapshot(&self, error: PmsError) {
        *self.snapshot_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn push_changes(&self, response: Result<Vec<PmsSyncEvent>, PmsError>) {
        self.changes.lock().unwrap().push_back(response);
    }

    pub(crate) fn cursors(&self) -> Vec<Option<DateTime<Utc>>> {
        self.cursors.lock().unwrap().clone()
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn change_calls(&self) -> usize {
        self.change_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond<T>(&self, answer: impl FnOnce() -> T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = answer();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl PmsClient for ScriptedPmsClient {
    async fn fetch_all_reservations(&self) -> Result<Vec<PmsReservation>, PmsError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(|| match self.snapshot_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(self.reservations.lock().unwrap().clone()),
        })
        .await
    }

    async fn fetch_changes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PmsSyncEvent>, PmsError> {
        self.change_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors.lock().unwrap().push(since);
        self.respond(|| {
            self.changes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        })
        .await
    }
}

/// SQLite store that can be told to fail a specific delete
pub(crate) struct FailingStore {
    inner: SqliteStore,
    fail_delete: Mutex<Option<String>>,
}

impl FailingStore {
    pub(crate) fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_delete: Mutex::new(None),
        }
    }

    pub(crate) fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub(crate) fn fail_delete_of(&self, pms_id: &str) {
        *self.fail_delete.lock().unwrap() = Some(pms_id.to_string());
    }
}

impl ReservationStore for FailingStore {
    fn list_reservations(&self) -> StoreResult<Vec<Reservation>> {
        self.inner.list_reservations()
    }

    fn get_reservation(&self, pms_id: &str) -> StoreResult<Option<Reservation>> {
        self.inner.get_reservation(pms_id)
    }

    fn reservation_count(&self) -> StoreResult<i64> {
        self.inner.reservation_count()
    }

    fn find_latest_sync_log(&self) -> StoreResult<Option<SyncLog>> {
        self.inner.find_latest_sync_log()
    }

    fn list_sync_logs(&self, limit: usize) -> StoreResult<Vec<SyncLog>> {
        self.inner.list_sync_logs(limit)
    }

    fn run_in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let fail_delete = self.fail_delete.lock().unwrap().clone();
        self.inner.run_in_transaction(|tx| {
            let mut wrapped = FailingTransaction {
                inner: tx,
                fail_delete,
            };
            f(&mut wrapped)
        })
    }
}

struct FailingTransaction<'a> {
    inner: &'a mut dyn StoreTransaction,
    fail_delete: Option<String>,
}

impl StoreTransaction for FailingTransaction<'_> {
    fn create_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        self.inner.create_reservation(reservation)
    }

    fn update_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        self.inner.update_reservation(reservation)
    }

    fn upsert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        self.inner.upsert_reservation(reservation)
    }

    fn delete_reservation(&mut self, pms_id: &str) -> StoreResult<bool> {
        if self.fail_delete.as_deref() == Some(pms_id) {
            return Err(StoreError::InvalidData {
                column: "pms_id",
                value: pms_id.to_string(),
            });
        }
        self.inner.delete_reservation(pms_id)
    }

    fn create_sync_log(&mut self, log: &NewSyncLog) -> StoreResult<SyncLog> {
        self.inner.create_sync_log(log)
    }
}
