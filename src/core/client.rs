//! # EventsClient: listener registration and transport lifecycle.
//!
//! ```text
//! add_events_listener(handle, filter)
//!     registry.write()                       (serializes registrations)
//!       ├─ closed?                 → EventsError::Closed
//!       ├─ already registered?     → Ok, first filter kept
//!       ├─ registry empty?         → manager.ensure_active()?   (error: not registered)
//!       └─ registry.add(handle, filter)
//!
//! remove_events_listener(handle)
//!     registry.write()
//!       ├─ absent?                 → Ok
//!       ├─ registry.remove(handle)
//!       └─ now empty?              → manager.ensure_inactive()?
//!
//! transport ── raw payload ──► Pipeline ── registry.read() ──► Dispatcher ──► receivers
//! ```
//!
//! Lock order is always registry, then transport manager.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::builder::EventsClientBuilder;
use super::pipeline::Pipeline;
use crate::api::SubscriptionApi;
use crate::config::EventsConfig;
use crate::error::EventsError;
use crate::listeners::{DispatchSnapshot, EventsListener, ListenerRegistry};
use crate::transport::TransportManager;

pub(crate) struct Inner {
    pub(crate) config: Arc<EventsConfig>,
    pub(crate) registry: Arc<RwLock<ListenerRegistry>>,
    pub(crate) manager: Mutex<TransportManager>,
    pub(crate) api: Arc<dyn SubscriptionApi>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) token: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Entry point for receiving cluster events.
///
/// Cheap to clone; clones share registrations and transports.
#[derive(Clone)]
pub struct EventsClient {
    inner: Arc<Inner>,
}

impl EventsClient {
    /// Starts building a client from `config`.
    pub fn builder(config: EventsConfig) -> EventsClientBuilder {
        EventsClientBuilder::new(config)
    }

    /// Builds a client with the default collaborators.
    pub fn new(config: EventsConfig) -> Result<Self, EventsError> {
        Self::builder(config).build()
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &EventsConfig {
        &self.inner.config
    }

    /// Registers `listener` for the kinds selected by `filter`.
    ///
    /// The first registration activates the configured transport; if that
    /// fails the error is returned and the listener is not registered.
    /// Registering a listener that is already present keeps its original filter.
    pub async fn add_events_listener(
        &self,
        listener: &EventsListener,
        filter: u32,
    ) -> Result<(), EventsError> {
        let mut registry = self.inner.registry.write().await;
        if self.inner.token.is_cancelled() {
            return Err(EventsError::Closed);
        }
        if registry.contains(listener.id()) {
            tracing::debug!(listener = ?listener.id(), "listener already registered, keeping its filter");
            return Ok(());
        }
        if registry.is_empty() {
            let mut manager = self.inner.manager.lock().await;
            if let Err(e) = manager.ensure_active().await {
                tracing::warn!(
                    transport = %self.inner.config.transport,
                    error = %e,
                    label = e.as_label(),
                    "events transport activation failed"
                );
                return Err(e);
            }
        }
        registry.add(listener, filter);
        tracing::debug!(listener = ?listener.id(), filter = format_args!("{filter:#x}"), "listener registered");
        Ok(())
    }

    /// Unregisters `listener`. Removing an absent listener does nothing.
    ///
    /// Removing the last listener deregisters the callback URL (callback
    /// transport only); an unsubscribe failure is returned, the listener stays
    /// removed.
    pub async fn remove_events_listener(&self, listener: &EventsListener) -> Result<(), EventsError> {
        let mut registry = self.inner.registry.write().await;
        if !registry.remove(listener.id()) {
            tracing::debug!(listener = ?listener.id(), "listener not registered");
            return Ok(());
        }
        tracing::debug!(listener = ?listener.id(), "listener removed");
        if registry.is_empty() {
            self.inner.manager.lock().await.ensure_inactive().await?;
        }
        Ok(())
    }

    /// Callback URL announced to the cluster, once the callback transport
    /// has been activated.
    pub async fn subscription_url(&self) -> Option<String> {
        let manager = self.inner.manager.lock().await;
        manager.subscription_url().map(str::to_string)
    }

    /// Callback URLs currently subscribed on the cluster.
    pub async fn subscriptions(&self) -> Result<Vec<String>, EventsError> {
        Ok(self.inner.api.subscriptions().await?)
    }

    /// Whether `callback_url` is in the cluster's subscription list.
    pub async fn has_subscription(&self, callback_url: &str) -> Result<bool, EventsError> {
        let urls = self.subscriptions().await?;
        Ok(urls.iter().any(|u| u == callback_url))
    }

    /// Removes `callback_url` from the cluster's subscription list.
    pub async fn unsubscribe(&self, callback_url: &str) -> Result<(), EventsError> {
        Ok(self.inner.api.unsubscribe(callback_url).await?)
    }

    pub async fn listener_count(&self) -> usize {
        self.inner.registry.read().await.len()
    }

    /// Delivery counters since the client was built.
    pub fn dispatch_stats(&self) -> DispatchSnapshot {
        self.inner.pipeline.stats().snapshot()
    }

    /// Drops every registration, deregisters the callback URL if it is
    /// subscribed, and stops all background tasks.
    ///
    /// Later registrations fail with [`EventsError::Closed`]. A second call
    /// does nothing.
    pub async fn shutdown(&self) -> Result<(), EventsError> {
        let mut registry = self.inner.registry.write().await;
        if self.inner.token.is_cancelled() {
            return Ok(());
        }
        registry.clear();
        let result = self.inner.manager.lock().await.ensure_inactive().await;
        self.inner.token.cancel();
        tracing::info!("events client shut down");
        result
    }
}
