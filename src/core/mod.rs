//! Client core: the public facade and the shared receive path.
//!
//! Internal modules:
//! - [`client`]: [`EventsClient`], listener registration and transport lifecycle;
//! - [`builder`]: [`EventsClientBuilder`], wires default or injected collaborators;
//! - [`pipeline`]: decode then dispatch, shared by both transports.

mod builder;
mod client;
mod pipeline;

pub use builder::EventsClientBuilder;
pub use client::EventsClient;
pub(crate) use pipeline::Pipeline;
