//! Shared receive path: raw payload → [`decode`] → [`Dispatcher`].
//!
//! Both transports hand every payload they receive to [`Pipeline::handle`].
//! Decode failures are logged and counted; they never reach a listener and
//! never stop the transport that delivered them.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::decode;
use crate::listeners::{DispatchStats, Dispatcher, ListenerRegistry};

pub(crate) struct Pipeline {
    registry: Arc<RwLock<ListenerRegistry>>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub(crate) fn new(registry: Arc<RwLock<ListenerRegistry>>) -> Self {
        Self {
            registry,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Decodes `raw` and dispatches it under the registry read lock.
    ///
    /// Returns the number of listeners the event was queued for.
    pub(crate) async fn handle(&self, raw: &str) -> usize {
        let event = match decode(raw) {
            Ok(event) => Arc::new(event),
            Err(e) => {
                self.dispatcher.stats().record_discarded();
                tracing::warn!(
                    error = %e,
                    label = e.as_label(),
                    payload = %truncate(raw, 256),
                    "discarding event payload"
                );
                return 0;
            }
        };

        let registry = self.registry.read().await;
        let delivered = self.dispatcher.dispatch(&event, &registry.snapshot());
        tracing::trace!(kind = %event.kind(), seq = event.seq(), delivered, "event dispatched");
        delivered
    }

    pub(crate) fn stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }
}

fn truncate(raw: &str, max: usize) -> &str {
    if raw.len() <= max {
        return raw;
    }
    let mut end = max;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}
