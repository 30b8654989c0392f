//! Upstream invoker: issues IPMI `execute` calls without blocking the loop.
//!
//! The bridge never awaits an upstream call itself.  [`UpstreamInvoker::invoke`]
//! spawns the call as its own task and returns a [`CallHandle`] immediately;
//! when the call resolves, the task posts a [`Completion`] tagged with the
//! transaction id onto a bounded channel that the event loop drains.
//!
//! ```text
//! on_frame ──invoke──► [task: executor.execute()] ──Completion──► mpsc ──► on_completion
//!              │
//!              └─► CallHandle (cancel = abort task)
//! ```
//!
//! # Completion contract
//!
//! Each handle produces at most one completion: `Ok(Response)`,
//! `Err(UpstreamError::Transport)` or `Err(UpstreamError::Timeout)`.  A handle
//! canceled before its task finishes produces none.  A completion that was
//! already queued when the handle got canceled is still delivered; the
//! outstanding-call slot drops it by transaction id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kcs_core::{Request, Response, TransactionId};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Depth of the completion channel.
///
/// A call is only submitted once a completion slot has been reserved for it,
/// so this also bounds the number of calls whose results are still in flight.
pub const COMPLETION_QUEUE_DEPTH: usize = 8;

/// Ways an upstream call can fail after it was submitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The call could not be completed: bus failure, method error,
    /// malformed reply, or service unavailable.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// No reply arrived within the configured duration.
    #[error("upstream call timed out")]
    Timeout,
}

/// Ways a call can fail before it was ever dispatched.
///
/// Reported synchronously by [`UpstreamInvoker::invoke`] so the bridge can
/// answer the host immediately instead of waiting for a completion that will
/// never come.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// Every completion slot is taken.
    #[error("upstream congested: completion queue full")]
    Congested,

    /// The completion receiver is gone; the loop is shutting down.
    #[error("upstream closed: completion receiver dropped")]
    Closed,

    /// The executor refused the call.
    #[error("upstream rejected call: {0}")]
    Rejected(String),
}

/// The result of one upstream call, tagged with its transaction.
#[derive(Debug)]
pub struct Completion {
    /// Transaction the call was submitted under.
    pub txn: TransactionId,
    /// What the call resolved to.
    pub outcome: Result<Response, UpstreamError>,
}

/// Trait for the service that actually executes IPMI commands.
///
/// The production implementation calls the IPMI host service over D-Bus;
/// tests use scripted executors.
#[async_trait]
pub trait IpmiExecutor: Send + Sync + 'static {
    /// Cheap synchronous admission check, run before anything is spawned.
    ///
    /// The default admits every request.
    fn admit(&self, _request: &Request) -> Result<(), SubmissionError> {
        Ok(())
    }

    /// Executes `request` and returns the upstream reply.
    ///
    /// `timeout` of `None` means "use the transport default".  Implementations
    /// enforce the timeout themselves and report expiry as
    /// [`UpstreamError::Timeout`].
    async fn execute(
        &self,
        request: Request,
        timeout: Option<Duration>,
    ) -> Result<Response, UpstreamError>;
}

/// Cancellation handle for one in-flight upstream call.
#[derive(Debug)]
pub struct CallHandle {
    txn: TransactionId,
    task: Option<JoinHandle<()>>,
}

impl CallHandle {
    fn new(txn: TransactionId, task: JoinHandle<()>) -> Self {
        Self {
            txn,
            task: Some(task),
        }
    }

    /// Transaction this handle belongs to.
    pub fn txn(&self) -> TransactionId {
        self.txn
    }

    /// Detaches the call: if its task has not finished yet it is aborted and
    /// will never post a completion.
    ///
    /// Safe to call any number of times, including after the call finished.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns upstream calls and routes their results to the completion channel.
pub struct UpstreamInvoker<E> {
    executor: Arc<E>,
    completions: mpsc::Sender<Completion>,
    timeout: Option<Duration>,
}

impl<E: IpmiExecutor> UpstreamInvoker<E> {
    /// Creates an invoker and the receiver its completions arrive on.
    pub fn new(executor: E, timeout: Option<Duration>) -> (Self, mpsc::Receiver<Completion>) {
        let (tx, rx) = mpsc::channel(COMPLETION_QUEUE_DEPTH);
        let invoker = Self {
            executor: Arc::new(executor),
            completions: tx,
            timeout,
        };
        (invoker, rx)
    }

    /// Submits `request` under `txn` and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::Rejected`] if the executor's admission check fails.
    /// - [`SubmissionError::Congested`] if no completion slot is free.
    /// - [`SubmissionError::Closed`] if the completion receiver was dropped.
    pub fn invoke(&self, txn: TransactionId, request: &Request) -> Result<CallHandle, SubmissionError> {
        self.executor.admit(request)?;

        // Reserve the completion slot up front so a finished call can always
        // post its result without waiting.
        let permit = self
            .completions
            .clone()
            .try_reserve_owned()
            .map_err(|e| match e {
                TrySendError::Full(_) => SubmissionError::Congested,
                TrySendError::Closed(_) => SubmissionError::Closed,
            })?;

        let executor = Arc::clone(&self.executor);
        let request = request.clone();
        let timeout = self.timeout;
        let task = tokio::spawn(async move {
            let outcome = executor.execute(request, timeout).await;
            permit.send(Completion { txn, outcome });
        });

        Ok(CallHandle::new(txn, task))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
