//! # kcs-core
//!
//! Shared library for the KCS bridge containing the KCS frame codec and the
//! IPMI message types that travel through it.
//!
//! This crate has zero dependencies on OS APIs, async runtimes, or the
//! message bus.  Everything here is pure data transformation, which keeps the
//! bit-packing rules easy to test in isolation.
//!
//! # Architecture overview
//!
//! A KCS (Keyboard Controller Style) interface is the byte pipe a host uses to
//! send IPMI commands to its BMC.  Every request the host writes looks like:
//!
//! ```text
//! [netfn:6 | lun:2][cmd:1][payload:N]
//! ```
//!
//! and every response the BMC writes back looks like:
//!
//! ```text
//! [(netfn|1):6 | lun:2][cmd:1][completion_code:1][payload:N]
//! ```
//!
//! - **`protocol::messages`** – the decoded [`Request`] / [`Response`] types,
//!   completion codes, and frame sizing constants.
//! - **`protocol::codec`** – `decode_request`, `encode_response` and friends.
//! - **`protocol::sequence`** – the transaction counter used to tag each
//!   in-flight upstream call.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `kcs_core::Request` instead of `kcs_core::protocol::messages::Request`.
pub use protocol::codec::{
    decode_request, encode_failure, encode_request, encode_response, DecodeError, EncodeError,
};
pub use protocol::messages::{CompletionCode, Request, Response, MAX_FRAME_SIZE};
pub use protocol::sequence::{TransactionCounter, TransactionId};
