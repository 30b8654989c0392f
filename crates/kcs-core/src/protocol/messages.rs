//! IPMI message types carried over the KCS interface.
//!
//! Field layout follows the IPMI v2.0 KCS interface chapter: Figure 9-1 for
//! requests and Figure 9-2 for responses.  The command payload is opaque to
//! this crate; only the three header fields are interpreted.

use std::fmt;

// ── Frame sizing constants ────────────────────────────────────────────────────

/// Capacity of the KCS transfer buffer, in bytes.
///
/// Applies in both directions: reads from the device use a buffer of this
/// size, and a response frame longer than this is rejected by the encoder.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Size of the request header: `netfn/lun` byte + `cmd` byte.
pub const REQUEST_HEADER_SIZE: usize = 2;

/// Size of the response header: `netfn/lun` byte + `cmd` byte + completion code.
pub const RESPONSE_HEADER_SIZE: usize = 3;

/// Largest network function code that fits in the 6-bit header field.
pub const NETFN_MAX: u8 = 0x3F;

/// Largest logical unit number that fits in the 2-bit header field.
pub const LUN_MAX: u8 = 0x03;

// ── Completion codes ──────────────────────────────────────────────────────────

/// A single IPMI completion code byte.
///
/// Only the two values the bridge itself produces are named here; any other
/// value is passed through verbatim from the upstream reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionCode(pub u8);

impl CompletionCode {
    /// Command completed normally.
    pub const SUCCESS: CompletionCode = CompletionCode(0x00);

    /// Unspecified error.
    ///
    /// The bridge writes this code in every frame it synthesizes on behalf of
    /// a request that did not get a usable upstream reply (submission failure,
    /// transport error, timeout, or an unencodable reply).
    pub const UNSPECIFIED_ERROR: CompletionCode = CompletionCode(0xFF);

    /// Returns `true` for [`CompletionCode::SUCCESS`].
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl From<u8> for CompletionCode {
    fn from(value: u8) -> Self {
        CompletionCode(value)
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

/// A request decoded from a host-written KCS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Network function code (6 bits).
    pub netfn: u8,
    /// Logical unit number (2 bits).
    pub lun: u8,
    /// Command code.
    pub cmd: u8,
    /// Command data; may be empty.
    pub payload: Vec<u8>,
}

/// A response ready to be encoded into a KCS frame.
///
/// Built either from a genuine upstream reply (header fields echoed by the
/// IPMI service) or synthesized from the original [`Request`] via
/// [`Response::failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Network function code as echoed by upstream.  The encoder forces the
    /// low bit on, so either the request or response netfn may be stored here.
    pub netfn: u8,
    /// Logical unit number.
    pub lun: u8,
    /// Command code.
    pub cmd: u8,
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Response data; may be empty.
    pub payload: Vec<u8>,
}

impl Response {
    /// Builds the synthetic failure response for `request`.
    ///
    /// Uses the request's own header fields, an empty payload, and
    /// [`CompletionCode::UNSPECIFIED_ERROR`].
    pub fn failure(request: &Request) -> Self {
        Self {
            netfn: request.netfn,
            lun: request.lun,
            cmd: request.cmd,
            completion_code: CompletionCode::UNSPECIFIED_ERROR,
            payload: Vec::new(),
        }
    }
}
