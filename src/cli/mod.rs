pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xenigo")]
#[command(about = "Watch subreddits and forward new posts to chat webhooks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: first of ./config.toml, config/, data/, ~/.config/xenigo/)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start monitoring every configured target
    Run {
        /// Cache file path, overriding [cache].path
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Validate the configuration and show the resolved targets
    Check,
    /// Write a commented default configuration file
    Init,
}
