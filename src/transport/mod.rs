//! Event delivery transports.
//!
//! ## Contents
//! - [`StreamConnector`], [`SseConnector`] open server-push streams
//! - [`Frame`], [`FrameDecoder`] incremental server-sent-events parsing
//! - callback transport: hosted HTTP endpoint plus remote subscription
//! - stream transport: persistent connection with member failover
//! - transport manager: activates the configured transport on demand
//!
//! Both transports hand raw payloads to the shared decode/dispatch pipeline.

mod callback;
mod connector;
mod frame;
mod manager;
mod stream;

pub(crate) use callback::CallbackTransport;
pub use connector::{FrameStream, SseConnector, StreamConnector};
pub use frame::{Frame, FrameDecoder};
pub(crate) use manager::TransportManager;
pub(crate) use stream::StreamTransport;

#[cfg(test)]
pub(crate) use callback::ActivationState;
