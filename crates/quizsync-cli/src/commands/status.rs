//! Status command handler

use anyhow::Result;

use quizsync_core::{Config, LocalCache};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(cache: &LocalCache, config: &Config, output: &Output) -> Result<()> {
    let stats = cache.stats()?;
    let location = cache
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "cache": location,
                    "remote_url": config.remote_url,
                    "collection": config.collection,
                    "schema_version": stats.schema_version,
                    "database_size": stats.database_size,
                    "counts": {
                        "questions": stats.questions,
                        "unvalidated": stats.unvalidated,
                        "log_entries": stats.log_entries
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stats.questions);
        }
        OutputFormat::Human => {
            println!("quizsync Status");
            println!("===============");
            println!();
            println!("Remote:");
            println!(
                "  URL:        {}",
                config.remote_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Collection: {}", config.collection);
            println!();
            println!("Cache:");
            println!("  Location: {}", location);
            println!("  Size:     {}", stats.database_size_human());
            println!("  Schema:   v{}", stats.schema_version);
            println!();
            println!("Contents:");
            println!("  Questions:   {}", stats.questions);
            if stats.unvalidated > 0 {
                println!("  Unvalidated: {}", stats.unvalidated);
            }
            println!("  Log entries: {}", stats.log_entries);
        }
    }

    Ok(())
}
