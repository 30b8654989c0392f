//! kcs-bridge library crate.
//!
//! Bridges the host-facing IPMI KCS character device (`/dev/ipmi-kcs*`) to the
//! IPMI host service on D-Bus.  One host request arrives as raw bytes on the
//! device, is decoded and forwarded as an `execute` method call, and the reply
//! (or the failure that replaced it) is encoded back into a KCS response frame.
//!
//! # Architecture
//!
//! ```text
//! Host (KCS bytes)
//!         ↕
//! [kcs-bridge]
//!   ├── domain/           BridgeConfig and channel-derived naming
//!   ├── application/      Outstanding-call slot, upstream invoker, bridge
//!   └── infrastructure/
//!         ├── kcs_device/   Non-blocking device I/O and ipmi_bmc ioctls
//!         ├── ipmi_host/    D-Bus executor for the IPMI host service
//!         ├── sms_server/   D-Bus SMS attention control object
//!         ├── config_file/  Optional TOML configuration
//!         └── event_loop/   Single-threaded reactor wiring it all together
//!         ↕
//! IPMI host service (D-Bus)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `kcs-core`; it reaches the device
//!   and the bus only through the `FrameSink`, `IpmiExecutor` and
//!   `AttentionControl` traits.
//! - `infrastructure` implements those traits with `nix`, `tokio` and `zbus`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: request/response correlation and framing.
pub mod application;

/// Infrastructure layer: device, D-Bus and the event loop.
pub mod infrastructure;
