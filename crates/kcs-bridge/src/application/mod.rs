//! Application layer for kcs-bridge.
//!
//! The application layer owns the protocol-correctness rules: it knows *what*
//! to do with a frame or a completion, but reaches the device and the bus only
//! through traits the infrastructure layer implements.
//!
//! # Responsibilities
//!
//! - Keeping at most one upstream call outstanding (`outstanding`)
//! - Dispatching upstream calls without blocking the loop (`upstream`)
//! - Turning frames into calls and completions into frames (`bridge_service`)
//! - The stateless attention-control operations (`attention`)
//!
//! # What does NOT belong here?
//!
//! - Opening the device or issuing ioctls (infrastructure)
//! - D-Bus connection setup and method marshalling (infrastructure)
//! - Waiting for readiness or signals (the event loop)

pub mod attention;
pub mod bridge_service;
pub mod outstanding;
pub mod upstream;

pub use attention::{apply_attention, AttentionCommand, AttentionControl};
pub use bridge_service::{
    BridgeStats, CompletionDisposition, DeviceError, FrameDisposition, FrameSink, KcsBridge,
};
pub use outstanding::{OutstandingCall, OutstandingSlot, SlotState};
pub use upstream::{
    CallHandle, Completion, IpmiExecutor, SubmissionError, UpstreamError, UpstreamInvoker,
    COMPLETION_QUEUE_DEPTH,
};
