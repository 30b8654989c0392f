//! Optional TOML configuration file for `kcsbridged`.
//!
//! Everything the daemon needs can be given on the command line; the file is
//! a convenience for deployments that prefer a unit file pointing at a config:
//!
//! ```toml
//! [bridge]
//! channel = "ipmi-kcs3"
//! timeout_ms = 5000
//! log_level = "debug"
//! ```
//!
//! Every key is optional.  Values given on the command line win over values
//! from the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file loading.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read.
    #[error("I/O error reading config at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
}

/// The `[bridge]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// KCS channel, e.g. `ipmi-kcs3`.
    pub channel: Option<String>,
    /// Upstream timeout in milliseconds; 0 selects the transport default.
    pub timeout_ms: Option<u64>,
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns the TOML error for malformed input or unknown keys.
pub fn parse_file_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Loads the configuration file at `path`.
///
/// Unlike a default-location lookup, an explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] if the file cannot be read and
/// [`ConfigFileError::Parse`] if its TOML is malformed.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file_config(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
