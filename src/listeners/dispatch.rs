//! # Dispatcher: non-blocking fan-out to filtered listeners.
//!
//! ```text
//! dispatch(Arc<Event>, snapshot)
//!     │   (kind bit & filter != 0 ?)
//!     ├──► try_send ──► [queue L1] ──► consumer 1
//!     ├──► skip                         (filter does not match)
//!     └──► try_send ──► [queue LN] ──► consumer N
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `dispatch()` uses `try_send`; it never waits on a consumer
//! - **Per-listener FIFO**: events enter each queue in `dispatch` call order
//! - **No cross-listener ordering**
//! - **Overflow**: when a listener's queue is full the *new* event is dropped
//!   for that listener only (drop-newest), counted and logged at `warn`
//! - **Closed**: a dropped receiver is counted and logged at `debug`; the
//!   registration stays until the consumer removes it

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;

use crate::events::Event;

use super::registry::Registration;

/// Atomic counters describing pipeline traffic.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    /// Events placed into a listener queue.
    pub delivered: u64,
    /// Events dropped because a listener queue was full.
    pub dropped_full: u64,
    /// Events dropped because a listener receiver was gone.
    pub dropped_closed: u64,
    /// Payloads discarded before dispatch (decode failures).
    pub discarded: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

/// Delivers decoded events to every listener whose filter selects them.
#[derive(Debug, Default)]
pub struct Dispatcher {
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fans `event` out over `registrations`.
    ///
    /// Returns the number of listeners the event was queued for.
    pub fn dispatch(&self, event: &Arc<Event>, registrations: &[Registration]) -> usize {
        let mut delivered = 0;
        for registration in registrations {
            if !event.kind().matches(registration.filter) {
                continue;
            }
            let listener = &registration.listener;
            match listener.sender().try_send(Arc::clone(event)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.stats.dropped_full.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        listener = ?listener.id(),
                        kind = %event.kind(),
                        seq = event.seq(),
                        "listener queue full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.stats.dropped_closed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        listener = ?listener.id(),
                        kind = %event.kind(),
                        "listener receiver dropped, skipping event"
                    );
                }
            }
        }
        self.stats
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}
