//! SQLite-backed reservation store
//!
//! ## Tables
//!
//! - `reservations` - one row per PMS id, timestamps as Unix milliseconds
//! - `sync_logs` - append-only history of committed sync passes
//!
//! `last_synced_at` never moves backwards: every write keeps the larger of
//! the stored and the incoming value.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    NewReservation, NewSyncLog, PaymentStatus, Reservation, ReservationStatus, SyncKind, SyncLog,
};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::traits::{ReservationStore, StoreTransaction};

const RESERVATION_COLUMNS: &str = "id, pms_id, guest_name, check_in, check_out, room_number, \
     status, adults, children, total_amount, payment_status, special_requests, last_synced_at";

const SYNC_LOG_COLUMNS: &str = "id, timestamp, kind, change_count, success";

/// SQLite implementation of `ReservationStore`
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database configured for this installation
    pub fn open_with_config(config: &Config) -> StoreResult<Self> {
        Self::open(&config.sqlite_path())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ReservationStore for SqliteStore {
    fn list_reservations(&self) -> StoreResult<Vec<Reservation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY check_in, pms_id"
        ))?;

        let rows = stmt.query_map([], ReservationRow::from_row)?;

        let mut reservations = Vec::new();
        for row in rows {
            reservations.push(row?.into_reservation()?);
        }
        Ok(reservations)
    }

    fn get_reservation(&self, pms_id: &str) -> StoreResult<Option<Reservation>> {
        let conn = self.lock()?;
        find_by_pms_id(&conn, pms_id)
    }

    fn reservation_count(&self) -> StoreResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))?;
        Ok(count)
    }

    fn find_latest_sync_log(&self) -> StoreResult<Option<SyncLog>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SYNC_LOG_COLUMNS} FROM sync_logs WHERE success = 1 \
                     ORDER BY timestamp DESC, id DESC LIMIT 1"
                ),
                [],
                SyncLogRow::from_row,
            )
            .optional()?;

        row.map(SyncLogRow::into_sync_log).transpose()
    }

    fn list_sync_logs(&self, limit: usize) -> StoreResult<Vec<SyncLog>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYNC_LOG_COLUMNS} FROM sync_logs ORDER BY timestamp DESC, id DESC LIMIT ?"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], SyncLogRow::from_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.into_sync_log()?);
        }
        Ok(logs)
    }

    fn run_in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let mut handle = SqliteTransaction { tx };

        // Dropping the transaction without commit rolls it back
        let value = f(&mut handle)?;

        handle.tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn create_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let id = Uuid::new_v4();
        self.tx
            .execute(
                &format!(
                    "INSERT INTO reservations ({RESERVATION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    id.to_string(),
                    reservation.pms_id,
                    reservation.guest_name,
                    to_millis(reservation.check_in),
                    to_millis(reservation.check_out),
                    reservation.room_number,
                    reservation.status.as_str(),
                    reservation.adults,
                    reservation.children,
                    reservation.total_amount,
                    reservation.payment_status.as_str(),
                    reservation.special_requests,
                    to_millis(reservation.last_synced_at),
                ],
            )
            .map_err(|e| StoreError::from_write(e, &reservation.pms_id))?;

        reload(&self.tx, &reservation.pms_id)
    }

    fn update_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let changed = self.tx.execute(
            "UPDATE reservations SET guest_name = ?2, check_in = ?3, check_out = ?4, \
             room_number = ?5, status = ?6, adults = ?7, children = ?8, total_amount = ?9, \
             payment_status = ?10, special_requests = ?11, \
             last_synced_at = MAX(last_synced_at, ?12) \
             WHERE pms_id = ?1",
            params![
                reservation.pms_id,
                reservation.guest_name,
                to_millis(reservation.check_in),
                to_millis(reservation.check_out),
                reservation.room_number,
                reservation.status.as_str(),
                reservation.adults,
                reservation.children,
                reservation.total_amount,
                reservation.payment_status.as_str(),
                reservation.special_requests,
                to_millis(reservation.last_synced_at),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                pms_id: reservation.pms_id.clone(),
            });
        }

        reload(&self.tx, &reservation.pms_id)
    }

    fn upsert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        self.tx
            .execute(
                &format!(
                    "INSERT INTO reservations ({RESERVATION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
                     ON CONFLICT(pms_id) DO UPDATE SET \
                        guest_name = excluded.guest_name, \
                        check_in = excluded.check_in, \
                        check_out = excluded.check_out, \
                        room_number = excluded.room_number, \
                        status = excluded.status, \
                        adults = excluded.adults, \
                        children = excluded.children, \
                        total_amount = excluded.total_amount, \
                        payment_status = excluded.payment_status, \
                        special_requests = excluded.special_requests, \
                        last_synced_at = MAX(reservations.last_synced_at, excluded.last_synced_at)"
                ),
                params![
                    Uuid::new_v4().to_string(),
                    reservation.pms_id,
                    reservation.guest_name,
                    to_millis(reservation.check_in),
                    to_millis(reservation.check_out),
                    reservation.room_number,
                    reservation.status.as_str(),
                    reservation.adults,
                    reservation.children,
                    reservation.total_amount,
                    reservation.payment_status.as_str(),
                    reservation.special_requests,
                    to_millis(reservation.last_synced_at),
                ],
            )
            .map_err(|e| StoreError::from_write(e, &reservation.pms_id))?;

        reload(&self.tx, &reservation.pms_id)
    }

    fn delete_reservation(&mut self, pms_id: &str) -> StoreResult<bool> {
        let deleted = self
            .tx
            .execute("DELETE FROM reservations WHERE pms_id = ?", params![pms_id])?;
        Ok(deleted > 0)
    }

    fn create_sync_log(&mut self, log: &NewSyncLog) -> StoreResult<SyncLog> {
        let millis = to_millis(log.timestamp);
        self.tx.execute(
            "INSERT INTO sync_logs (timestamp, kind, change_count, success) VALUES (?, ?, ?, ?)",
            params![millis, log.kind.as_str(), log.change_count, log.success],
        )?;

        // Timestamps are stored at millisecond precision
        Ok(SyncLog {
            id: self.tx.last_insert_rowid(),
            timestamp: from_millis("timestamp", millis)?,
            kind: log.kind,
            change_count: log.change_count,
            success: log.success,
        })
    }
}

fn find_by_pms_id(conn: &Connection, pms_id: &str) -> StoreResult<Option<Reservation>> {
    let row = conn
        .query_row(
            &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE pms_id = ?"),
            params![pms_id],
            ReservationRow::from_row,
        )
        .optional()?;

    row.map(ReservationRow::into_reservation).transpose()
}

fn reload(conn: &Connection, pms_id: &str) -> StoreResult<Reservation> {
    find_by_pms_id(conn, pms_id)?.ok_or_else(|| StoreError::NotFound {
        pms_id: pms_id.to_string(),
    })
}

fn to_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

fn from_millis(column: &'static str, millis: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::InvalidData {
            column,
            value: millis.to_string(),
        })
}

/// Raw database row for the reservations table
struct ReservationRow {
    id: String,
    pms_id: String,
    guest_name: String,
    check_in: i64,
    check_out: i64,
    room_number: String,
    status: String,
    adults: u32,
    children: u32,
    total_amount: f64,
    payment_status: String,
    special_requests: Option<String>,
    last_synced_at: i64,
}

impl ReservationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            pms_id: row.get(1)?,
            guest_name: row.get(2)?,
            check_in: row.get(3)?,
            check_out: row.get(4)?,
            room_number: row.get(5)?,
            status: row.get(6)?,
            adults: row.get(7)?,
            children: row.get(8)?,
            total_amount: row.get(9)?,
            payment_status: row.get(10)?,
            special_requests: row.get(11)?,
            last_synced_at: row.get(12)?,
        })
    }

    fn into_reservation(self) -> StoreResult<Reservation> {
        let id = Uuid::parse_str(&self.id).map_err(|_| StoreError::InvalidData {
            column: "id",
            value: self.id.clone(),
        })?;
        let status =
            ReservationStatus::parse(&self.status).ok_or_else(|| StoreError::InvalidData {
                column: "status",
                value: self.status.clone(),
            })?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::InvalidData {
                column: "payment_status",
                value: self.payment_status.clone(),
            }
        })?;

        Ok(Reservation {
            id,
            pms_id: self.pms_id,
            guest_name: self.guest_name,
            check_in: from_millis("check_in", self.check_in)?,
            check_out: from_millis("check_out", self.check_out)?,
            room_number: self.room_number,
            status,
            adults: self.adults,
            children: self.children,
            total_amount: self.total_amount,
            payment_status,
            special_requests: self.special_requests,
            last_synced_at: from_millis("last_synced_at", self.last_synced_at)?,
        })
    }
}

struct SyncLogRow {
    id: i64,
    timestamp: i64,
    kind: String,
    change_count: u32,
    success: bool,
}

impl SyncLogRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            kind: row.get(2)?,
            change_count: row.get(3)?,
            success: row.get(4)?,
        })
    }

    fn into_sync_log(self) -> StoreResult<SyncLog> {
        let kind = SyncKind::parse(&self.kind).ok_or_else(|| StoreError::InvalidData {
            column: "kind",
            value: self.kind.clone(),
        })?;

        Ok(SyncLog {
            id: self.id,
            timestamp: from_millis("timestamp", self.timestamp)?,
            kind,
            change_count: self.change_count,
            success: self.success,
        })
    }
}
