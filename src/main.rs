use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use rc_car_runtime::config::{Config, ConfigError};
use tracing_subscriber::EnvFilter;

/// Teleoperated car runtime: serial + HTTP commands with a liveness watchdog
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON config file (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device for the command channel
    #[arg(long)]
    serial_port: Option<String>,

    /// Serial baudrate
    #[arg(long)]
    baud: Option<u32>,

    /// Bind address for the HTTP control endpoint
    #[arg(long)]
    http_bind: Option<SocketAddr>,

    /// Disable the HTTP control endpoint
    #[arg(long, conflicts_with = "http_bind")]
    no_http: bool,

    /// Hold both simulated sensor lines active
    #[arg(long)]
    simulate_signals: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides
    fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(port) = self.serial_port {
            config.serial_port = Some(port);
        }
        if let Some(baud) = self.baud {
            config.serial_baudrate = baud;
        }
        if let Some(addr) = self.http_bind {
            config.http_bind = Some(addr);
        }
        if self.no_http {
            config.http_bind = None;
        }
        if self.simulate_signals {
            config.simulate_signals = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rc_car_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
