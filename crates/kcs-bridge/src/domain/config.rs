//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from the channel identifier (plus an optional
//! upstream timeout) and then handed to the event loop.
//!
//! # Channel-derived naming
//!
//! | Item           | Value for channel `ipmi-kcs3`                        |
//! |----------------|------------------------------------------------------|
//! | device path    | `/dev/ipmi-kcs3`                                     |
//! | object path    | `/xyz/openbmc_project/Ipmi/Channel/ipmi_kcs3`        |
//! | service name   | `xyz.openbmc_project.Ipmi.Channel.ipmi_kcs3`         |
//!
//! D-Bus names may not contain `-`, so dashes become underscores in the
//! object path and the service name.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Interface name of the SMS attention control object.
pub const SMS_INTERFACE: &str = "xyz.openbmc_project.Ipmi.Channel.SMS";

const OBJECT_PATH_PREFIX: &str = "/xyz/openbmc_project/Ipmi/Channel/";
const SERVICE_NAME_PREFIX: &str = "xyz.openbmc_project.Ipmi.Channel.";

/// Errors produced while validating configuration input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No channel was given on the command line or in the config file.
    #[error("missing KCS channel")]
    MissingChannel,

    /// The channel cannot be turned into a device path and D-Bus names.
    #[error("invalid KCS channel `{channel}`: {reason}")]
    InvalidChannel {
        channel: String,
        reason: &'static str,
    },
}

/// All runtime configuration for one KCS bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Channel identifier as given by the user, e.g. `ipmi-kcs3`.
    pub channel: String,

    /// Character device carrying the KCS traffic.
    pub device_path: PathBuf,

    /// Object path the SMS control interface is served at.
    pub object_path: String,

    /// Well-known bus name requested for this channel.
    pub service_name: String,

    /// Upstream `execute` timeout.  `None` selects the transport default.
    pub method_timeout: Option<Duration>,
}

impl BridgeConfig {
    /// Builds the configuration for `channel`.
    ///
    /// A `timeout_ms` of 0 means "use the transport default", matching the
    /// command-line convention.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannel`] if the channel is empty,
    /// starts with a digit, or contains anything other than ASCII
    /// alphanumerics, `-` and `_`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kcs_bridge::domain::BridgeConfig;
    ///
    /// let cfg = BridgeConfig::for_channel("ipmi-kcs3", 0).unwrap();
    /// assert_eq!(cfg.device_path.to_str(), Some("/dev/ipmi-kcs3"));
    /// assert_eq!(cfg.service_name, "xyz.openbmc_project.Ipmi.Channel.ipmi_kcs3");
    /// assert!(cfg.method_timeout.is_none());
    /// ```
    pub fn for_channel(channel: &str, timeout_ms: u64) -> Result<Self, ConfigError> {
        validate_channel(channel)?;

        let token = channel.replace('-', "_");
        Ok(Self {
            channel: channel.to_string(),
            device_path: PathBuf::from(format!("/dev/{channel}")),
            object_path: format!("{OBJECT_PATH_PREFIX}{token}"),
            service_name: format!("{SERVICE_NAME_PREFIX}{token}"),
            method_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        })
    }
}

fn validate_channel(channel: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidChannel {
        channel: channel.to_string(),
        reason,
    };

    let first = channel.chars().next().ok_or_else(|| invalid("empty"))?;
    if first.is_ascii_digit() {
        return Err(invalid("must not start with a digit"));
    }
    if !channel
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only ASCII letters, digits, `-` and `_` are allowed"));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
