//! # Transport manager: picks and drives the configured transport.
//!
//! The client calls [`TransportManager::ensure_active`] when its registry goes
//! from empty to non-empty and [`TransportManager::ensure_inactive`] when it
//! goes back to empty. Both calls are serialized by the client.
//!
//! | transport | ensure_active             | ensure_inactive         |
//! |-----------|---------------------------|-------------------------|
//! | Callback  | bind once, subscribe URL  | unsubscribe URL         |
//! | Stream    | start connect loop once   | no-op (runs until shutdown) |

use super::callback::CallbackTransport;
use super::stream::StreamTransport;
use crate::error::EventsError;

pub(crate) enum TransportManager {
    Callback(CallbackTransport),
    Stream(StreamTransport),
}

impl TransportManager {
    pub(crate) async fn ensure_active(&mut self) -> Result<(), EventsError> {
        match self {
            TransportManager::Callback(callback) => callback.activate().await,
            TransportManager::Stream(stream) => stream.activate().await,
        }
    }

    pub(crate) async fn ensure_inactive(&mut self) -> Result<(), EventsError> {
        match self {
            TransportManager::Callback(callback) => callback.deactivate().await,
            TransportManager::Stream(_) => {
                tracing::debug!("stream transport has no teardown, leaving it running");
                Ok(())
            }
        }
    }

    /// Callback URL, once the callback transport has computed one.
    pub(crate) fn subscription_url(&self) -> Option<&str> {
        match self {
            TransportManager::Callback(callback) => callback.callback_url(),
            TransportManager::Stream(_) => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn callback(&self) -> Option<&CallbackTransport> {
        match self {
            TransportManager::Callback(callback) => Some(callback),
            TransportManager::Stream(_) => None,
        }
    }
}
