//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pmsync_core::{Config, UnsupportedEventPolicy};

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, provider_name, provider_id, api_version, api_key, \
                          api_endpoint, hotel_id, sync_interval_secs, request_timeout_secs, \
                          incremental_retries, retry_initial_delay_ms, retry_max_delay_ms, \
                          unsupported_events, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let api_key = config.api_key.as_deref().map(redact);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "provider": config.provider,
                    "api_key": api_key,
                    "api_endpoint": config.api_endpoint,
                    "hotel_id": config.hotel_id,
                    "sync_interval_secs": config.sync_interval_secs,
                    "request_timeout_secs": config.request_timeout_secs,
                    "incremental_retries": config.incremental_retries,
                    "retry_initial_delay_ms": config.retry_initial_delay_ms,
                    "retry_max_delay_ms": config.retry_max_delay_ms,
                    "unsupported_events": config.unsupported_events,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:               {}", config.data_dir.display());
            println!("  provider_name:          {}", config.provider.name);
            println!("  provider_id:            {}", config.provider.id);
            println!("  api_version:            {}", config.provider.api_version);
            println!(
                "  api_key:                {}",
                api_key.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  api_endpoint:           {}",
                config.api_endpoint.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  hotel_id:               {}",
                config.hotel_id.as_deref().unwrap_or("(not set)")
            );
            println!("  sync_interval_secs:     {}", config.sync_interval_secs);
            println!("  request_timeout_secs:   {}", config.request_timeout_secs);
            println!("  incremental_retries:    {}", config.incremental_retries);
            println!("  retry_initial_delay_ms: {}", config.retry_initial_delay_ms);
            println!("  retry_max_delay_ms:     {}", config.retry_max_delay_ms);
            println!(
                "  unsupported_events:     {}",
                config.unsupported_events.as_str()
            );
            println!(
                "  log_file:               {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "api_key" {
        redact(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "provider_name" => config.provider.name = value.to_string(),
        "provider_id" => config.provider.id = value.to_string(),
        "api_version" => config.provider.api_version = value.to_string(),
        "api_key" => config.api_key = optional(value),
        "api_endpoint" => config.api_endpoint = optional(value),
        "hotel_id" => config.hotel_id = optional(value),
        "sync_interval_secs" => {
            let secs: u64 = number(key, value)?;
            if secs == 0 {
                bail!("sync_interval_secs must be greater than zero");
            }
            config.sync_interval_secs = secs;
        }
        "request_timeout_secs" => config.request_timeout_secs = number(key, value)?,
        "incremental_retries" => config.incremental_retries = number(key, value)?,
        "retry_initial_delay_ms" => config.retry_initial_delay_ms = number(key, value)?,
        "retry_max_delay_ms" => config.retry_max_delay_ms = number(key, value)?,
        "unsupported_events" => {
            let Some(policy) = UnsupportedEventPolicy::parse(value) else {
                bail!("Invalid value for unsupported_events. Use 'skip' or 'fail'.");
            };
            config.unsupported_events = policy;
        }
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    match value.trim().parse() {
        Ok(n) => Ok(n),
        Err(_) => bail!("Invalid value for {}: expected a non-negative number", key),
    }
}

/// Keep only the last four characters of a secret
fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
