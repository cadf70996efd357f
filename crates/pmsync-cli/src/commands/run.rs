//! Long-running sync

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use pmsync_core::{Config, SyncScheduler};

use crate::commands::build_reconciler;
use crate::output::Output;

/// Start the scheduler and run until Ctrl-C
pub async fn run(config: &Config, output: &Output) -> Result<()> {
    let reconciler = Arc::new(build_reconciler(config)?);
    let interval = reconciler.config().sync_interval;
    let scheduler = SyncScheduler::new(reconciler).with_retry_policy(config.retry_policy());
    let mut status = scheduler.subscribe();

    output.message(&format!(
        "Syncing every {}s. Press Ctrl-C to stop.",
        interval.as_secs()
    ));
    scheduler.start().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Scheduler status: {}", status.borrow().as_str());
            }
        }
    }

    output.message("Stopping...");
    scheduler.stop().await;
    output.success("Sync stopped");
    Ok(())
}
