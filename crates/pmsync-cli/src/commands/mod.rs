//! Command handlers

pub mod config;
pub mod log;
pub mod reservations;
pub mod run;
pub mod status;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};

use pmsync_core::{Config, HttpPmsClient, Reconciler, SqliteStore};

pub type CliReconciler = Reconciler<HttpPmsClient, SqliteStore>;

/// Open the local store
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open_with_config(config).with_context(|| {
        format!(
            "Failed to open reservation store at {}",
            config.sqlite_path().display()
        )
    })
}

/// Wire the HTTP client and SQLite store into a reconciler
pub fn build_reconciler(config: &Config) -> Result<CliReconciler> {
    let pms = config.pms_config()?;
    let client = HttpPmsClient::new(pms.clone()).context("Failed to create PMS client")?;
    let store = Arc::new(open_store(config)?);

    Ok(Reconciler::new(pms, client, store).with_unsupported_policy(config.unsupported_events))
}
