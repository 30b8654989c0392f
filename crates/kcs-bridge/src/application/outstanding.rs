//! The outstanding-call slot.
//!
//! A KCS channel carries one transaction at a time, so the bridge tracks at
//! most one upstream call.  The slot is either `Idle` or `Pending(txn)`:
//!
//! ```text
//!          install(call)                complete(txn) / supersede()
//!  Idle ───────────────► Pending(txn) ───────────────────────────► Idle
//!                           │   ▲
//!                           └───┘ install(new call): old one is canceled first
//! ```
//!
//! A completion is only accepted when its transaction id matches the pending
//! call; anything else is stale and the caller drops it.

use std::time::{Duration, Instant};

use kcs_core::{Request, TransactionId};

use super::upstream::CallHandle;

/// Observable state of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No upstream call is in flight.
    Idle,
    /// The call with this transaction id is in flight.
    Pending(TransactionId),
}

/// One in-flight upstream call and what is needed to answer it.
#[derive(Debug)]
pub struct OutstandingCall {
    /// Transaction the call was submitted under.
    pub txn: TransactionId,
    /// The decoded request, kept to build a failure frame.
    pub request: Request,
    handle: CallHandle,
    started: Instant,
}

impl OutstandingCall {
    /// Wraps a freshly submitted call.
    pub fn new(request: Request, handle: CallHandle) -> Self {
        Self {
            txn: handle.txn(),
            request,
            handle,
            started: Instant::now(),
        }
    }

    /// Time since the call was submitted.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Holds at most one [`OutstandingCall`].
#[derive(Debug, Default)]
pub struct OutstandingSlot {
    current: Option<OutstandingCall>,
}

impl OutstandingSlot {
    /// Creates an idle slot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SlotState {
        match &self.current {
            Some(call) => SlotState::Pending(call.txn),
            None => SlotState::Idle,
        }
    }

    /// Cancels the pending call, if any, and returns the slot to `Idle`.
    ///
    /// Returns the transaction id of the call that was canceled.
    pub fn supersede(&mut self) -> Option<TransactionId> {
        let mut call = self.current.take()?;
        call.handle.cancel();
        Some(call.txn)
    }

    /// Makes `call` the pending call.
    ///
    /// A call that is still pending gets canceled first, so the slot never
    /// holds two.  Returns the superseded transaction id, if there was one.
    pub fn install(&mut self, call: OutstandingCall) -> Option<TransactionId> {
        let superseded = self.supersede();
        self.current = Some(call);
        superseded
    }

    /// Takes the pending call if it belongs to `txn`.
    ///
    /// Returns `None`, leaving the slot untouched, for a stale completion.
    pub fn complete(&mut self, txn: TransactionId) -> Option<OutstandingCall> {
        match &self.current {
            Some(call) if call.txn == txn => self.current.take(),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::upstream::{
        Completion, IpmiExecutor, SubmissionError, UpstreamError, UpstreamInvoker,
    };
    use async_trait::async_trait;
    use kcs_core::Response;
    use tokio::sync::mpsc;

    /// Never answers; calls stay pending until aborted.
    struct SilentExecutor;

    #[async_trait]
    impl IpmiExecutor for SilentExecutor {
        async fn execute(
            &self,
            _request: Request,
            _timeout: Option<Duration>,
        ) -> Result<Response, UpstreamError> {
            std::future::pending().await
        }
    }

    fn make_request() -> Request {
        Request {
            netfn: 6,
            lun: 0,
            cmd: 1,
            payload: vec![],
        }
    }

    fn submit(
        invoker: &UpstreamInvoker<SilentExecutor>,
        txn: u64,
    ) -> Result<OutstandingCall, SubmissionError> {
        let request = make_request();
        let handle = invoker.invoke(TransactionId(txn), &request)?;
        Ok(OutstandingCall::new(request, handle))
    }

    fn setup() -> (UpstreamInvoker<SilentExecutor>, mpsc::Receiver<Completion>) {
        UpstreamInvoker::new(SilentExecutor, None)
    }

    #[tokio::test]
    async fn test_new_slot_is_idle() {
        let slot = OutstandingSlot::new();

        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[tokio::test]
    async fn test_install_makes_slot_pending() {
        // Arrange
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();

        // Act
        let superseded = slot.install(submit(&invoker, 1).unwrap());

        // Assert
        assert_eq!(superseded, None);
        assert_eq!(slot.state(), SlotState::Pending(TransactionId(1)));
    }

    #[tokio::test]
    async fn test_install_over_pending_supersedes_it() {
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();
        slot.install(submit(&invoker, 1).unwrap());

        let superseded = slot.install(submit(&invoker, 2).unwrap());

        assert_eq!(superseded, Some(TransactionId(1)));
        assert_eq!(slot.state(), SlotState::Pending(TransactionId(2)));
    }

    #[tokio::test]
    async fn test_supersede_cancels_and_idles() {
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();
        slot.install(submit(&invoker, 5).unwrap());

        let canceled = slot.supersede();

        assert_eq!(canceled, Some(TransactionId(5)));
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[tokio::test]
    async fn test_supersede_on_idle_slot_is_noop() {
        let mut slot = OutstandingSlot::new();

        assert_eq!(slot.supersede(), None);
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[tokio::test]
    async fn test_complete_with_current_txn_takes_call() {
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();
        slot.install(submit(&invoker, 3).unwrap());

        let call = slot.complete(TransactionId(3)).expect("current call");

        assert_eq!(call.txn, TransactionId(3));
        assert_eq!(call.request, make_request());
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[tokio::test]
    async fn test_complete_with_stale_txn_is_ignored() {
        // Arrange: txn 1 superseded by txn 2
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();
        slot.install(submit(&invoker, 1).unwrap());
        slot.install(submit(&invoker, 2).unwrap());

        // Act
        let stale = slot.complete(TransactionId(1));

        // Assert: txn 2 is still pending
        assert!(stale.is_none());
        assert_eq!(slot.state(), SlotState::Pending(TransactionId(2)));
    }

    #[tokio::test]
    async fn test_complete_on_idle_slot_is_ignored() {
        let mut slot = OutstandingSlot::new();

        assert!(slot.complete(TransactionId(1)).is_none());
    }

    #[tokio::test]
    async fn test_superseded_call_frees_its_completion_slot() {
        // Arrange: fill and supersede far more calls than the queue can hold
        let (invoker, _rx) = setup();
        let mut slot = OutstandingSlot::new();

        // Act / Assert: aborting a never-polled task drops its reservation
        for txn in 0..64 {
            slot.install(submit(&invoker, txn).expect("slot must be free"));
            tokio::task::yield_now().await;
        }
        assert_eq!(slot.state(), SlotState::Pending(TransactionId(63)));
    }
}
