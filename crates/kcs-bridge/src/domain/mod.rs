//! Domain layer for kcs-bridge.
//!
//! Pure configuration types.  Everything a running bridge needs to know about
//! its channel (device path, D-Bus names, upstream timeout) is derived here
//! from the channel identifier without touching the file system or the bus.

pub mod config;

pub use config::{BridgeConfig, ConfigError, SMS_INTERFACE};
