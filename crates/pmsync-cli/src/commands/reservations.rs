//! Reservation command handlers

use anyhow::{bail, Result};

use pmsync_core::{Config, ReservationStore};

use crate::commands::open_store;
use crate::output::Output;

/// List all local reservations
pub fn list(config: &Config, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let reservations = store.list_reservations()?;
    output.print_reservations(&reservations)
}

/// Show one reservation by PMS id
pub fn show(config: &Config, pms_id: &str, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let Some(reservation) = store.get_reservation(pms_id.trim())? else {
        bail!("Reservation not found: {}", pms_id);
    };
    output.print_reservation(&reservation)
}
