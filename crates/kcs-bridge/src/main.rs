//! `kcsbridged`: IPMI KCS bridge daemon, entry point.
//!
//! Bridges one KCS channel (`/dev/<channel>`) to the IPMI host service on the
//! system bus, and serves the channel's SMS attention interface.
//!
//! # Usage
//!
//! ```text
//! kcsbridged [OPTIONS]
//!
//! Options:
//!   -c, --channel <CHANNEL>        KCS channel, e.g. ipmi-kcs3
//!   -t, --timeout-ms <MS>          Upstream timeout; 0 selects the bus default
//!       --config <PATH>            Optional TOML config file
//!   -v, --verbose...               Raise log verbosity (-v debug, -vv trace)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable         | Description                              |
//! |------------------|------------------------------------------|
//! | `KCS_CHANNEL`    | KCS channel                              |
//! | `KCS_TIMEOUT_MS` | Upstream timeout in milliseconds         |
//! | `KCS_CONFIG`     | Path to the TOML config file             |
//! | `RUST_LOG`       | `tracing` filter; wins over every other level setting |
//!
//! Command-line values (or their environment variables) take precedence over
//! the config file.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kcs_bridge::domain::{BridgeConfig, ConfigError};
use kcs_bridge::infrastructure::config_file::BridgeSection;
use kcs_bridge::infrastructure::{load_file_config, run_bridge, ConfigFileError, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// IPMI KCS bridge daemon.
///
/// Forwards host IPMI requests read from a KCS device to the IPMI host service
/// over D-Bus and writes the replies back.
#[derive(Debug, Parser)]
#[command(
    name = "kcsbridged",
    about = "Bridges an IPMI KCS character device to the IPMI host service over D-Bus",
    version
)]
struct Cli {
    /// KCS channel to bridge, e.g. `ipmi-kcs3` for `/dev/ipmi-kcs3`.
    #[arg(short, long, env = "KCS_CHANNEL")]
    channel: Option<String>,

    /// Upstream `execute` timeout in milliseconds.
    ///
    /// 0 selects the bus default of 25 seconds.
    #[arg(short = 't', long, env = "KCS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Path to an optional TOML config file with a `[bridge]` table.
    #[arg(long, env = "KCS_CONFIG")]
    config: Option<PathBuf>,

    /// Raise log verbosity: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Loads the `--config` file, or an empty config when none was given.
    fn load_file(&self) -> Result<FileConfig, ConfigFileError> {
        match &self.config {
            Some(path) => load_file_config(path),
            None => Ok(FileConfig::default()),
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    fn log_level(&self, file: &BridgeSection) -> String {
        match self.verbose {
            0 => file.log_level.clone().unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    /// Merges the CLI arguments over `file` into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingChannel`] if neither source names a
    /// channel, or [`ConfigError::InvalidChannel`] if the channel is unusable.
    fn into_bridge_config(self, file: BridgeSection) -> Result<BridgeConfig, ConfigError> {
        let channel = self
            .channel
            .or(file.channel)
            .ok_or(ConfigError::MissingChannel)?;
        let timeout_ms = self.timeout_ms.or(file.timeout_ms).unwrap_or(0);
        BridgeConfig::for_channel(&channel, timeout_ms)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// Everything runs on a current-thread runtime: the event loop, the upstream
/// call tasks and the D-Bus object server take turns on one thread.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the config file, if any, is loaded.
/// 2. `tracing_subscriber` is initialised (`RUST_LOG`, else `-v`, else the
///    file's `log_level`, else `info`).  A config file that failed to load
///    is reported through it.
/// 3. A [`BridgeConfig`] is derived from the channel.
/// 4. [`run_bridge`] opens the device, claims the bus name and runs until
///    SIGINT or SIGTERM.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = cli.load_file();

    // ── Logging setup ─────────────────────────────────────────────────────────
    let default_level = match &file {
        Ok(file) => cli.log_level(&file.bridge),
        Err(_) => cli.log_level(&BridgeSection::default()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let file = match file {
        Ok(file) => file,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    let config = match cli.into_bridge_config(file.bridge) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    info!(
        "KCS bridge starting: device={}, service={}, timeout={:?}",
        config.device_path.display(),
        config.service_name,
        config.method_timeout
    );

    match run_bridge(&config).await {
        Ok(_stats) => {
            info!("KCS bridge stopped");
            Ok(())
        }
        Err(e) => {
            error!("{e:#}");
            Err(e)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
