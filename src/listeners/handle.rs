//! # Listener handles and their delivery conduits.
//!
//! [`listener`] creates a pair: the [`EventsListener`] handle that is
//! registered with the client, and the [`EventsReceiver`] the consumer reads
//! from. The conduit between them is a bounded `mpsc` queue; when it is full,
//! new events for that listener are dropped (see
//! [`Dispatcher`](crate::Dispatcher)).
//!
//! ```rust
//! # async fn demo(client: marathon_events::EventsClient) -> Result<(), marathon_events::EventsError> {
//! use marathon_events::{filter, listener};
//!
//! let (handle, mut events) = listener(256);
//! client.add_events_listener(&handle, filter::DEPLOYMENTS).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{} #{}", event.kind(), event.seq());
//! }
//! # Ok(()) }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::events::Event;

/// Default capacity of a listener queue.
pub const DEFAULT_LISTENER_CAPACITY: usize = 1024;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque listener identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registration handle of one consumer.
///
/// Cloning keeps the same identity; every clone refers to the same conduit.
#[derive(Debug, Clone)]
pub struct EventsListener {
    id: ListenerId,
    sender: mpsc::Sender<Arc<Event>>,
}

impl EventsListener {
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// True once the matching [`EventsReceiver`] is dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) fn sender(&self) -> &mpsc::Sender<Arc<Event>> {
        &self.sender
    }
}

/// Consumer side of a listener conduit.
#[derive(Debug)]
pub struct EventsReceiver {
    id: ListenerId,
    rx: mpsc::Receiver<Arc<Event>>,
}

impl EventsReceiver {
    /// Identity of the handle this receiver belongs to.
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once every [`EventsListener`] clone and registration is gone.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Takes a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }

    /// Number of events waiting in the queue.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Unwraps the underlying queue receiver.
    pub fn into_inner(self) -> mpsc::Receiver<Arc<Event>> {
        self.rx
    }
}

/// Creates a listener handle and its receiver with a queue of `capacity` events.
///
/// A capacity of `0` is raised to `1`.
#[must_use]
pub fn listener(capacity: usize) -> (EventsListener, EventsReceiver) {
    let id = ListenerId::next();
    let (sender, rx) = mpsc::channel(capacity.max(1));
    (EventsListener { id, sender }, EventsReceiver { id, rx })
}
