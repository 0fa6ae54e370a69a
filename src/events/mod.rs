//! Event data model and payload decoding.
//!
//! ## Contents
//! - [`EventKind`], [`filter`] the discriminator registry and listener masks
//! - [`Event`], [`EventPayload`] decoded, immutable events
//! - [`decode`] two-pass text-to-event decoder used by both transports
//!
//! Payload schemas for each kind live in [`payload`].

mod decode;
mod event;
mod kind;
pub mod payload;

pub use decode::decode;
pub use event::Event;
pub use kind::{EventKind, filter};
pub use payload::EventPayload;
