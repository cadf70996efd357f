//! SQLite schema for the local reservation store

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Reconciled projection of PMS reservations
        CREATE TABLE IF NOT EXISTS reservations (
            id TEXT PRIMARY KEY,
            pms_id TEXT NOT NULL UNIQUE,
            guest_name TEXT NOT NULL,
            check_in INTEGER NOT NULL,
            check_out INTEGER NOT NULL,
            room_number TEXT NOT NULL,
            status TEXT NOT NULL,
            adults INTEGER NOT NULL,
            children INTEGER NOT NULL,
            total_amount REAL NOT NULL,
            payment_status TEXT NOT NULL,
            special_requests TEXT,
            last_synced_at INTEGER NOT NULL
        );

        -- Append-only sync history
        CREATE TABLE IF NOT EXISTS sync_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            kind TEXT NOT NULL,
            change_count INTEGER NOT NULL,
            success INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reservations_check_in ON reservations(check_in);
        CREATE INDEX IF NOT EXISTS idx_reservations_room ON reservations(room_number);
        CREATE INDEX IF NOT EXISTS idx_sync_logs_timestamp ON sync_logs(timestamp);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
