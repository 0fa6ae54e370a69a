//! # Decoded events delivered to listeners.
//!
//! An [`Event`] is built once per received payload by [`decode`](crate::decode)
//! and then shared read-only (`Arc<Event>`) with every matching listener.
//!
//! ## Ordering
//! `seq` is taken from a process-wide counter at decode time, so it follows
//! receipt order at the transport. A listener can compare `seq` values to
//! confirm it saw events in the order they arrived.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use super::kind::EventKind;
use super::payload::EventPayload;

/// Global receipt counter.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Immutable decoded event.
#[derive(Debug, Clone)]
pub struct Event {
    seq: u64,
    received_at: SystemTime,
    kind: EventKind,
    payload: EventPayload,
}

impl Event {
    pub(crate) fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            received_at: SystemTime::now(),
            kind,
            payload,
        }
    }

    /// Monotonic receipt sequence.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wall-clock time the payload was decoded.
    #[inline]
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Filter bit of [`Event::kind`].
    #[inline]
    pub fn bit(&self) -> u32 {
        self.kind.bit()
    }

    #[inline]
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Consumes the event, returning its payload.
    pub fn into_payload(self) -> EventPayload {
        self.payload
    }
}
