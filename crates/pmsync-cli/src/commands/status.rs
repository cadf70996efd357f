//! Status command handler

use anyhow::Result;

use pmsync_core::{Config, ReservationStore};

use crate::commands::open_store;
use crate::output::{Output, OutputFormat};

/// Show store contents, last sync and PMS settings
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let count = store.reservation_count()?;
    let latest = store.find_latest_sync_log()?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "reservations": count,
                    "last_sync": latest,
                    "provider": config.provider,
                    "hotel_id": config.hotel_id,
                    "api_endpoint": config.api_endpoint,
                    "sync_interval_secs": config.sync_interval_secs,
                    "database": config.sqlite_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", count);
        }
        OutputFormat::Human => {
            println!("pmsync Status");
            println!("=============");
            println!();
            println!("PMS:");
            println!(
                "  Provider: {} ({}, API {})",
                config.provider.name, config.provider.id, config.provider.api_version
            );
            println!(
                "  Hotel:    {}",
                config.hotel_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  Endpoint: {}",
                config.api_endpoint.as_deref().unwrap_or("(not set)")
            );
            println!("  Interval: {}s", config.sync_interval_secs);
            println!();
            println!("Last sync:");
            match latest {
                Some(log) => {
                    println!(
                        "  {} ({}, {} change(s))",
                        log.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                        log.kind.as_str(),
                        log.change_count
                    );
                }
                None => println!("  never"),
            }
            println!();
            println!("Storage:");
            println!("  Database:     {}", config.sqlite_path().display());
            println!("  Reservations: {}", count);
        }
    }

    Ok(())
}
