use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use xenigo::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xenigo=info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run { cache } => {
            commands::run(config, cache).await?;
        }
        Commands::Check => {
            commands::check(config)?;
        }
        Commands::Init => {
            commands::init(config)?;
        }
    }

    Ok(())
}
