//! Listener handles, the listener registry and the dispatcher.
//!
//! ## Architecture
//! ```text
//!   listener(cap) ──► (EventsListener, EventsReceiver)
//!                          │                 ▲
//!   add_events_listener ───┘                 │ bounded mpsc
//!          ▼                                 │
//!   ListenerRegistry { id → (listener, filter) }
//!          │ snapshot (read lock)            │
//!          ▼                                 │
//!   Dispatcher::dispatch(event) ── try_send ─┘
//! ```

mod dispatch;
mod handle;
mod registry;

pub use dispatch::{DispatchSnapshot, DispatchStats, Dispatcher};
pub use handle::{DEFAULT_LISTENER_CAPACITY, EventsListener, EventsReceiver, ListenerId, listener};
pub use registry::{ListenerRegistry, Registration};
