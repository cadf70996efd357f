//! Sync history

use anyhow::Result;

use pmsync_core::{Config, ReservationStore};

use crate::commands::open_store;
use crate::output::Output;

pub fn show(config: &Config, limit: usize, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let logs = store.list_sync_logs(limit)?;
    output.print_sync_logs(&logs)
}
