use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use audiopi::DaemonConfig;
use audiopi_state::logging::{init_logging, LoggingMode};

/// Multiroom audio orchestration daemon
#[derive(Parser, Debug)]
#[command(name = "audiopi")]
#[command(about = "Multiroom audio orchestration daemon for the Audio-Pi image")]
#[command(version)]
struct Args {
    /// Configuration file, read instead of ./audiopi.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Logging mode: silent, development, debug or json
    #[arg(long, value_name = "MODE")]
    log_mode: Option<LoggingMode>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        DaemonConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    if args.check_config {
        println!("configuration ok");
        return Ok(());
    }

    // Flag, then AUDIOPI_LOG_MODE, then the config file
    let mode = match args.log_mode {
        Some(mode) => mode,
        None => config.logging_mode()?,
    };
    init_logging(mode, &config.log_level).context("Failed to initialize logging")?;

    print_summary(&config);

    if let Err(err) = audiopi::daemon::run(&config).await {
        error!("audiopi failed: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(config: &DaemonConfig) {
    info!("audiopi {}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Listen: {}:{}-{}",
        config.server.host, config.server.port_range.0, config.server.port_range.1
    );
    info!("  Mixer: card {} {}", config.mixer.card, config.mixer.control);
    info!("  Sources: {}", config.sources.len());
    info!("  Zones: {}", config.zones.len());
    info!("  Settings: {}", config.settings_path.display());
}
