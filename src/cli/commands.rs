use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::config::{Config, CONFIG_FILE};
use crate::daemon::Daemon;

pub async fn run(config_path: Option<&Path>, cache: Option<PathBuf>) -> Result<()> {
    let (config, path) = Config::load(config_path)?;
    tracing::info!(path = %path.display(), "Loaded configuration");

    let ctx = Arc::new(AppContext::new(config, cache)?);
    Daemon::new(ctx).run().await
}

pub fn check(config_path: Option<&Path>) -> Result<()> {
    let (config, path) = Config::load(config_path)?;

    println!("Configuration OK: {}", path.display());
    println!("Access context: {}", config.access_context());
    println!("Cache file: {}", config.cache.path.display());
    println!();

    let targets = config.targets();
    println!("{} target(s):", targets.len());
    for target in &targets {
        println!(
            "  {} -> r/{} ({}), {} every {}s, limit {}, {} attempts {}s apart",
            target.name,
            target.subreddit,
            target.sorting,
            target.output,
            target.interval_secs,
            target.limit,
            target.attempts(),
            target.retry_interval().as_secs(),
        );
    }

    let flags = config.developer_flags.explicitly_set();
    if !flags.is_empty() {
        println!();
        println!("Developer flags:");
        for (flag, value) in flags {
            println!("  {} = {}", flag, value);
        }
    }

    Ok(())
}

pub fn init(config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    if Config::write_default(&path)? {
        println!("Wrote default configuration to {}", path.display());
    } else {
        println!("Configuration already exists: {}", path.display());
    }
    Ok(())
}
