//! Cache management commands

use chrono::Utc;
use colored::Colorize;

use folio::config::{CacheBackend, Config};
use folio::error::Result;
use folio::store::SqliteCache;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::print_json;

/// Open the on-disk cache, or explain why there is none
fn open(config: &Config, format: OutputFormat) -> Result<Option<(SqliteCache, String)>> {
    if config.cache.enabled && config.cache.backend == CacheBackend::Sqlite {
        let dir = config.cache_dir()?;
        let cache = SqliteCache::open_at(&dir)?;
        return Ok(Some((cache, dir.display().to_string())));
    }

    let reason = if config.cache.enabled {
        "memory"
    } else {
        "disabled"
    };
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "backend": reason }))?,
        OutputFormat::Pretty => println!("No on-disk cache (cache backend: {})", reason),
    }
    Ok(None)
}

/// Show cache status/statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let Some((cache, path)) = open(&ctx.config, ctx.format)? else {
        return Ok(());
    };
    let stats = cache.stats(Utc::now())?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "backend": "sqlite",
            "path": path,
            "ttl_secs": ctx.config.cache.ttl_secs,
            "total_entries": stats.total_entries,
            "valid_entries": stats.valid_entries,
            "expired_entries": stats.expired_entries,
            "total_size_bytes": stats.total_size_bytes,
            "total_size_human": format_size(stats.total_size_bytes),
            "newest_entry_timestamp": stats.newest_entry,
        })),
        OutputFormat::Pretty => {
            println!("{}", "Cache Status".bold());
            println!("────────────────────────────────────────");
            println!("Location:       {}", path);
            println!("TTL:            {}s", ctx.config.cache.ttl_secs);
            println!("Valid entries:  {}", stats.valid_entries);
            println!("Expired:        {}", stats.expired_entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));

            if let Some(newest) = stats.newest_entry {
                let dt = chrono::DateTime::from_timestamp(newest, 0)
                    .map(|d| {
                        d.with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M")
                            .to_string()
                    })
                    .unwrap_or_else(|| "unknown".to_string());
                println!("Newest entry:   {}", dt);
            }
            Ok(())
        }
    }
}

/// Clear all cache entries
pub fn clear(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let Some((cache, _)) = open(&ctx.config, ctx.format)? else {
        return Ok(());
    };
    let stats = cache.clear_all()?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "entries_removed": stats.entries_removed,
        })),
        OutputFormat::Pretty => {
            if stats.entries_removed > 0 {
                println!("Cleared {} cache entries", stats.entries_removed);
            } else {
                println!("Cache was already empty");
            }
            Ok(())
        }
    }
}

/// Format bytes as human-readable size
fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
