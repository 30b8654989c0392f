//! Transaction numbering for in-flight upstream calls.
//!
//! Every request the bridge forwards gets a [`TransactionId`].  The id travels
//! with the upstream call and comes back attached to its completion, which is
//! how the bridge tells the completion of the current call apart from a late
//! completion of one it has already superseded.
//!
//! The counter uses `AtomicU64` so it can be handed out through `&self`, even
//! though the bridge itself only ever touches it from one thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one bridged request/response transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A monotonically increasing source of [`TransactionId`]s.
///
/// Ids start at 1 and wrap around at `u64::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use kcs_core::TransactionCounter;
///
/// let counter = TransactionCounter::new();
/// assert_eq!(counter.next().0, 1);
/// assert_eq!(counter.next().0, 2);
/// ```
pub struct TransactionCounter {
    inner: AtomicU64,
}

impl TransactionCounter {
    /// Creates a new counter; the first id handed out is 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Returns the next transaction id and advances the counter.
    pub fn next(&self) -> TransactionId {
        // `fetch_add` returns the value before the addition and wraps on overflow.
        TransactionId(self.inner.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransactionCounter {
    fn default() -> Self {
        Self::new()
    }
}
