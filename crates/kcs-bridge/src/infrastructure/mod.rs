//! Infrastructure layer for kcs-bridge.
//!
//! The infrastructure layer handles all I/O: the KCS character device, the
//! system bus, the optional config file and the reactor that ties them
//! together.
//!
//! # Responsibilities
//!
//! - Non-blocking reads and single-shot writes on the KCS device
//! - The three `ipmi_bmc` administrative ioctls
//! - Calling `execute` on the IPMI host service over D-Bus
//! - Serving the SMS attention interface on D-Bus
//! - Loading the optional TOML config file
//! - Running the event loop and handling SIGINT/SIGTERM
//! - Signalling readiness to the service manager
//!
//! # What does NOT belong here?
//!
//! - Frame encoding and decoding (kcs-core)
//! - Supersession, stale-completion and failure-frame rules (application)
//! - Deriving names from the channel (domain)

pub mod config_file;
pub mod event_loop;
pub mod ipmi_host;
pub mod kcs_device;
pub mod sms_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use config_file::{load_file_config, ConfigFileError, FileConfig};
pub use event_loop::{run_bridge, serve};
pub use kcs_device::KcsDevice;
