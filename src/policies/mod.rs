//! Reconnect pacing for the stream transport.
//!
//! - [`BackoffPolicy`] how the delay between reconnect attempts evolves
//! - [`JitterPolicy`]  randomization applied to each delay
//!
//! `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=Equal.
//! `BackoffPolicy::none()` retries immediately.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
