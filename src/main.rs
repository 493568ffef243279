use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use helios::{Config, DriverHandle, KebaDriver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "helios",
    version = env!("APP_VERSION"),
    about = "PV surplus charge controller for KEBA wallboxes"
)]
struct Cli {
    /// Configuration file (defaults to the standard locations)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Read power delta values (W, one per line) from stdin
    #[arg(long)]
    delta_from_stdin: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_override(cli.config.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    if cli.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    helios::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("Helios {} starting up", env!("APP_VERSION"));

    let (mut driver, handle) = KebaDriver::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create driver: {}", e))?;

    if cli.delta_from_stdin {
        tokio::spawn(feed_power_delta(handle.clone()));
    }

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = signal_handle.shutdown();
        }
    });

    match driver.run().await {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}

async fn feed_power_delta(handle: DriverHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.parse::<f64>() {
                    Ok(watts) => {
                        if handle.set_power_delta(watts).is_err() {
                            break;
                        }
                    }
                    Err(_) => warn!("Ignoring invalid power delta '{}'", trimmed),
                }
            }
            Ok(None) => {
                info!("Power delta input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read power delta: {}", e);
                break;
            }
        }
    }
}
