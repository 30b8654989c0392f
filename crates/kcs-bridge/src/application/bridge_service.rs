//! KCS bridge orchestration.
//!
//! [`KcsBridge`] ties the frame codec, the outstanding-call slot and the
//! upstream invoker together.  It is driven by two kinds of events, both
//! delivered by the event loop on one thread:
//!
//! ```text
//! device readable ──► on_frame(bytes)
//!                       decode ─► supersede ─► invoke ─► install
//!                                                 │
//!                                                 └─ submission failed ─► failure frame
//!
//! completion ───────► on_completion(Completion)
//!                       slot.complete(txn) ─► encode ─► write_frame
//!                            │                  │
//!                            └─ stale: drop     └─ encode failed ─► failure frame
//! ```
//!
//! None of the per-transaction errors escape this module: each one ends as a
//! written frame, a dropped completion, or a logged device error.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use kcs_core::{
    decode_request, encode_failure, encode_response, Request, Response, TransactionCounter,
    TransactionId,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::outstanding::{OutstandingCall, OutstandingSlot};
use super::upstream::{Completion, IpmiExecutor, UpstreamInvoker};

// ── Device boundary ───────────────────────────────────────────────────────────

/// Failures at the KCS device boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A read or write on the character device failed.
    #[error("KCS device I/O error: {0}")]
    Io(#[from] io::Error),

    /// The device accepted only part of a response frame.
    #[error("short write to KCS device: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// An administrative ioctl failed.
    #[error("KCS device control `{op}` failed: {source}")]
    Control {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Destination for encoded response frames.
///
/// Implementations must write the whole frame in one operation; a partial
/// write is reported as [`DeviceError::ShortWrite`] and never retried.
pub trait FrameSink {
    fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError>;
}

impl<T: FrameSink + ?Sized> FrameSink for Arc<T> {
    fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError> {
        (**self).write_frame(frame)
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Counters kept by the bridge for diagnostics.
///
/// Nothing in the protocol path reads these back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames that decoded into a request.
    pub requests: u64,
    /// Genuine upstream replies written to the device.
    pub responses: u64,
    /// Synthetic failure frames written to the device.
    pub failures: u64,
    /// Pending calls canceled by a newer request.
    pub superseded: u64,
    /// Frames too short to decode.
    pub discarded: u64,
    /// Completions dropped because their call was no longer pending.
    pub stale: u64,
    /// Frames the device did not accept.
    pub write_errors: u64,
}

impl fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} responses={} failures={} superseded={} discarded={} stale={} write_errors={}",
            self.requests,
            self.responses,
            self.failures,
            self.superseded,
            self.discarded,
            self.stale,
            self.write_errors
        )
    }
}

// ── Event outcomes ────────────────────────────────────────────────────────────

/// What [`KcsBridge::on_frame`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Zero-length read; nothing to do.
    Ignored,
    /// Too short to decode; dropped without a response.
    Discarded,
    /// Forwarded upstream under this transaction.
    Submitted(TransactionId),
    /// Could not be forwarded; a failure frame was written immediately.
    Rejected(TransactionId),
}

/// What [`KcsBridge::on_completion`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    /// The call was no longer pending; nothing was written.
    Stale,
    /// The upstream reply was written.
    Responded,
    /// A failure frame was written in place of the reply.
    FailureSent,
    /// The frame could not be written to the device.
    WriteFailed,
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// The request/response correlation engine for one KCS channel.
pub struct KcsBridge<S, E> {
    sink: S,
    invoker: UpstreamInvoker<E>,
    slot: OutstandingSlot,
    txns: TransactionCounter,
    stats: BridgeStats,
}

impl<S: FrameSink, E: IpmiExecutor> KcsBridge<S, E> {
    /// Creates a bridge writing to `sink` and calling `executor`.
    ///
    /// Returns the bridge together with the receiver that completions arrive
    /// on; the caller feeds each one back through
    /// [`on_completion`](Self::on_completion).
    pub fn new(sink: S, executor: E, timeout: Option<Duration>) -> (Self, mpsc::Receiver<Completion>) {
        let (invoker, completions) = UpstreamInvoker::new(executor, timeout);
        let bridge = Self {
            sink,
            invoker,
            slot: OutstandingSlot::new(),
            txns: TransactionCounter::new(),
            stats: BridgeStats::default(),
        };
        (bridge, completions)
    }

    /// Handles one frame read from the device.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_frame(&mut self, bytes: &[u8]) -> FrameDisposition {
        if bytes.is_empty() {
            return FrameDisposition::Ignored;
        }

        let request = match decode_request(bytes) {
            Ok(request) => request,
            Err(e) => {
                warn!("discarding KCS frame: {e}");
                self.stats.discarded += 1;
                return FrameDisposition::Discarded;
            }
        };
        self.stats.requests += 1;

        // The old call must be gone before the new one is dispatched.
        if let Some(old) = self.slot.supersede() {
            warn!("request {old} superseded before completion; its reply will be dropped");
            self.stats.superseded += 1;
        }

        let txn = self.txns.next();
        debug!(
            "request {txn}: netfn=0x{:02x} lun={} cmd=0x{:02x} payload=[{}]",
            request.netfn,
            request.lun,
            request.cmd,
            hex(&request.payload)
        );

        match self.invoker.invoke(txn, &request) {
            Ok(handle) => {
                self.slot.install(OutstandingCall::new(request, handle));
                FrameDisposition::Submitted(txn)
            }
            Err(e) => {
                warn!("request {txn}: {e}; answering with failure frame");
                self.write_failure(txn, &request);
                FrameDisposition::Rejected(txn)
            }
        }
    }

    /// Handles the completion of an upstream call.
    pub fn on_completion(&mut self, completion: Completion) -> CompletionDisposition {
        let Completion { txn, outcome } = completion;

        let Some(call) = self.slot.complete(txn) else {
            debug!("dropping stale completion for request {txn}");
            self.stats.stale += 1;
            return CompletionDisposition::Stale;
        };
        debug!("request {txn}: upstream finished in {:?}", call.elapsed());

        match outcome {
            Ok(response) => self.write_response(txn, &call.request, &response),
            Err(e) => {
                warn!("request {txn}: {e}; answering with failure frame");
                self.write_failure(txn, &call.request)
            }
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn slot(&self) -> &OutstandingSlot {
        &self.slot
    }

    fn write_response(
        &mut self,
        txn: TransactionId,
        request: &Request,
        response: &Response,
    ) -> CompletionDisposition {
        let frame = match encode_response(response) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("request {txn}: cannot encode upstream reply: {e}; answering with failure frame");
                return self.write_failure(txn, request);
            }
        };

        if response.completion_code.is_success() {
            debug!("response {txn}: payload=[{}]", hex(&response.payload));
        } else {
            debug!(
                "response {txn}: upstream completion code {} payload=[{}]",
                response.completion_code,
                hex(&response.payload)
            );
        }
        if self.write(txn, &frame) {
            self.stats.responses += 1;
            CompletionDisposition::Responded
        } else {
            CompletionDisposition::WriteFailed
        }
    }

    fn write_failure(&mut self, txn: TransactionId, request: &Request) -> CompletionDisposition {
        let frame = encode_failure(request);
        if self.write(txn, &frame) {
            self.stats.failures += 1;
            CompletionDisposition::FailureSent
        } else {
            CompletionDisposition::WriteFailed
        }
    }

    fn write(&mut self, txn: TransactionId, frame: &[u8]) -> bool {
        match self.sink.write_frame(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("request {txn}: {e}");
                self.stats.write_errors += 1;
                false
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
