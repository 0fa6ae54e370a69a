//! # marathon-events
//!
//! **marathon-events** is the event subscription core of a Marathon client.
//!
//! It receives cluster state-change events (deployments, task status, health
//! checks) over one of two transports, decodes them into typed [`Event`]s and
//! fans them out to any number of listeners, each filtering by [`EventKind`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            Marathon cluster (members A, B, ...)
//!                 │                          ▲
//!   POST <callback path>            GET <member>/v2/events
//!   (push, callback transport)      (pull, stream transport)
//!                 ▼                          │
//! ┌────────────────────────────┐  ┌──────────┴──────────────────┐
//! │ CallbackTransport          │  │ StreamTransport             │
//! │ - axum endpoint, always 200│  │ - StreamConnector (SSE)     │
//! │ - SubscriptionApi          │  │ - Cluster failover, backoff │
//! │   (list / subscribe /      │  │ - reconnects until shutdown │
//! │    unsubscribe)            │  │                             │
//! └─────────────┬──────────────┘  └──────────────┬──────────────┘
//!               └──────────► raw payload ◄───────┘
//!                                 ▼
//!                  ┌─────────────────────────────┐
//!                  │ Pipeline                    │
//!                  │ decode(): envelope → schema │──► warn + discard on error
//!                  └──────────────┬──────────────┘
//!                                 ▼  registry.read()
//!                  ┌─────────────────────────────┐
//!                  │ Dispatcher                  │
//!                  │ kind.bit() & filter != 0 ?  │
//!                  └──┬───────────┬───────────┬──┘
//!                     ▼           ▼           ▼
//!                 [queue L1]  [queue L2]  [queue LN]   bounded, drop-newest
//!                     ▼           ▼           ▼
//!               EventsReceiver EventsReceiver EventsReceiver
//! ```
//!
//! ### Lifecycle
//! ```text
//! EventsClient::add_events_listener(handle, filter)
//!   ├─ registry empty → TransportManager::ensure_active()
//!   │      ├─ Callback: bind once, subscribe callback URL if absent
//!   │      └─ Stream:   connect loop once (member failover), spawn read loop
//!   └─ registry.add(handle, filter)           (first filter wins)
//!
//! EventsClient::remove_events_listener(handle)
//!   └─ registry now empty → TransportManager::ensure_inactive()
//!          ├─ Callback: unsubscribe callback URL (local endpoint keeps running)
//!          └─ Stream:   no-op
//!
//! EventsClient::shutdown()
//!   └─ clear registry, unsubscribe if subscribed, cancel background tasks
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                                |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------------|
//! | **Client**        | Register listeners, drive transport lifecycle.               | [`EventsClient`], [`EventsClientBuilder`]         |
//! | **Listeners**     | Bounded per-consumer queues with kind filters.               | [`listener`], [`EventsListener`], [`EventsReceiver`] |
//! | **Events**        | Typed events, kind bits, two-pass decoding.                  | [`Event`], [`EventKind`], [`filter`], [`decode`]  |
//! | **Collaborators** | Cluster membership, subscription REST, stream connections.   | [`Cluster`], [`SubscriptionApi`], [`StreamConnector`] |
//! | **Policies**      | Reconnect pacing for the stream transport.                   | [`BackoffPolicy`], [`JitterPolicy`]               |
//! | **Errors**        | Typed errors for registration, decoding, REST and streams.   | [`EventsError`], [`DecodeError`]                  |
//! | **Configuration** | Transport choice, callback binding, endpoints, timeouts.     | [`EventsConfig`], [`EventsTransport`]             |
//!
//! ## Example
//! ```rust,no_run
//! use marathon_events::{EventsClient, EventsConfig, EventKind, filter, listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = EventsConfig {
//!         members: vec!["http://marathon-1:8080".into(), "http://marathon-2:8080".into()],
//!         ..EventsConfig::default()
//!     }
//!     .with_transport("stream")?;
//!
//!     let client = EventsClient::new(cfg)?;
//!     let (handle, mut events) = listener(256);
//!     client
//!         .add_events_listener(&handle, filter::DEPLOYMENTS | EventKind::StatusUpdate.bit())
//!         .await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{} {:?}", event.kind(), event.payload().app_id());
//!     }
//!     client.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod api;
mod cluster;
mod config;
mod core;
mod error;
mod events;
mod listeners;
mod policies;
mod transport;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use api::{HttpSubscriptionApi, SubscriptionApi};
pub use cluster::{Cluster, MemberList};
pub use config::{EventsConfig, EventsTransport};
pub use crate::core::{EventsClient, EventsClientBuilder};
pub use error::{ApiError, DecodeError, EventsError, StreamError};
pub use events::{Event, EventKind, EventPayload, decode, filter, payload};
pub use listeners::{
    DEFAULT_LISTENER_CAPACITY, DispatchSnapshot, DispatchStats, Dispatcher, EventsListener,
    EventsReceiver, ListenerId, ListenerRegistry, Registration, listener,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use transport::{Frame, FrameDecoder, FrameStream, SseConnector, StreamConnector};
