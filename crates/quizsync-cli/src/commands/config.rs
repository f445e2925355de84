//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quizsync_core::Config;

use crate::output::{Output, OutputFormat};

const KEYS: &str = "data_dir, remote_url, collection, request_timeout_secs, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "remote_url": config.remote_url,
                    "collection": config.collection,
                    "request_timeout_secs": config.request_timeout_secs,
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
            println!("  data_dir:             {}", config.data_dir.display());
            println!(
                "  remote_url:           {}",
                config.remote_url.as_deref().unwrap_or("(not set)")
            );
            println!("  collection:           {}", config.collection);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  log_file:             {}",
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

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one key/value pair; "" or "none" clears optional keys
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let cleared = value.is_empty() || value == "none";

    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "remote_url" => {
            config.remote_url = if cleared { None } else { Some(value.to_string()) };
        }
        "collection" => {
            if value.is_empty() {
                bail!("collection cannot be empty");
            }
            config.collection = value.to_string();
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "log_file" => {
            config.log_file = if cleared { None } else { Some(value.into()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }

    Ok(())
}
