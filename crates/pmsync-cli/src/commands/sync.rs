//! Sync command handlers

use anyhow::Result;
use tracing::debug;

use pmsync_core::Config;

use crate::commands::build_reconciler;
use crate::output::Output;

/// Reconcile the whole reservation set against the PMS
pub async fn full(config: &Config, output: &Output) -> Result<()> {
    // main prints the returned error
    let reconciler = build_reconciler(config)?
        .with_error_handler(|e| debug!("Full sync failed: {}", e));

    output.message(&format!(
        "Syncing reservations for hotel {}...",
        reconciler.config().hotel_id
    ));
    let report = reconciler.full_sync().await?;
    output.print_full_report(&report)
}

/// Apply PMS changes since the last successful sync
pub async fn incremental(config: &Config, output: &Output) -> Result<()> {
    let reconciler = build_reconciler(config)?
        .with_error_handler(|e| debug!("Incremental sync failed: {}", e));

    let report = reconciler.incremental_sync().await?;
    output.print_incremental_report(&report)
}
