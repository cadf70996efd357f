//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use pmsync_core::{FullSyncReport, IncrementalSyncReport, Reservation, SyncLog};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single reservation
    pub fn print_reservation(&self, reservation: &Reservation) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("PMS ID:      {}", reservation.pms_id);
                println!("Local ID:    {}", reservation.id);
                println!("Guest:       {}", reservation.guest_name);
                println!("Room:        {}", reservation.room_number);
                println!(
                    "Stay:        {} -> {}",
                    reservation.check_in.format("%Y-%m-%d %H:%M"),
                    reservation.check_out.format("%Y-%m-%d %H:%M")
                );
                println!("Status:      {}", reservation.status.as_str());
                println!(
                    "Guests:      {} adult(s), {} child(ren)",
                    reservation.adults, reservation.children
                );
                println!(
                    "Amount:      {:.2} ({})",
                    reservation.total_amount,
                    reservation.payment_status.as_str()
                );
                if let Some(ref requests) = reservation.special_requests {
                    println!("Requests:    {}", requests);
                }
                println!(
                    "Synced:      {}",
                    reservation.last_synced_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            OutputFormat::Json => print_json(reservation)?,
            OutputFormat::Quiet => println!("{}", reservation.pms_id),
        }
        Ok(())
    }

    /// Print a list of reservations
    pub fn print_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if reservations.is_empty() {
                    println!("No reservations found.");
                    return Ok(());
                }
                for r in reservations {
                    println!(
                        "{} | {} | {} | {} -> {} | {}",
                        truncate(&r.pms_id, 14),
                        truncate(&r.guest_name, 25),
                        truncate(&r.room_number, 6),
                        r.check_in.format("%Y-%m-%d"),
                        r.check_out.format("%Y-%m-%d"),
                        r.status.as_str()
                    );
                }
                println!("\n{} reservation(s)", reservations.len());
            }
            OutputFormat::Json => print_json(&reservations)?,
            OutputFormat::Quiet => {
                for r in reservations {
                    println!("{}", r.pms_id);
                }
            }
        }
        Ok(())
    }

    /// Print sync history
    pub fn print_sync_logs(&self, logs: &[SyncLog]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if logs.is_empty() {
                    println!("No syncs recorded yet.");
                    return Ok(());
                }
                for log in logs {
                    println!(
                        "{} | {:<11} | {:>5} change(s) | {}",
                        log.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        log.kind.as_str(),
                        log.change_count,
                        if log.success { "ok" } else { "failed" }
                    );
                }
            }
            OutputFormat::Json => print_json(&logs)?,
            OutputFormat::Quiet => {
                for log in logs {
                    println!("{}", log.id);
                }
            }
        }
        Ok(())
    }

    pub fn print_full_report(&self, report: &FullSyncReport) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.success("Full sync complete");
                println!(
                    "  Created: {}, Updated: {} ({} unchanged), Deleted: {}",
                    report.created, report.updated, report.unchanged, report.deleted
                );
            }
            OutputFormat::Json => print_json(report)?,
            OutputFormat::Quiet => println!("{}", report.change_count()),
        }
        Ok(())
    }

    pub fn print_incremental_report(&self, report: &IncrementalSyncReport) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if report.events == 0 {
                    self.success("Incremental sync complete - already up to date");
                    return Ok(());
                }
                self.success(&format!(
                    "Incremental sync complete - {} change(s)",
                    report.events
                ));
                println!(
                    "  Upserted: {}, Deleted: {}, Already absent: {}, Handled: {}, Skipped: {}",
                    report.upserted,
                    report.deleted,
                    report.already_absent,
                    report.handled,
                    report.unsupported
                );
            }
            OutputFormat::Json => print_json(report)?,
            OutputFormat::Quiet => println!("{}", report.events),
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
