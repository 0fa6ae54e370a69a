use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::client::{EventsClient, Inner};
use super::pipeline::Pipeline;
use crate::api::{HttpSubscriptionApi, SubscriptionApi};
use crate::cluster::{Cluster, MemberList};
use crate::config::{EventsConfig, EventsTransport};
use crate::error::EventsError;
use crate::listeners::ListenerRegistry;
use crate::transport::{
    CallbackTransport, SseConnector, StreamConnector, StreamTransport, TransportManager,
};

/// Builder for an [`EventsClient`] with optional collaborator overrides.
pub struct EventsClientBuilder {
    config: EventsConfig,
    cluster: Option<Arc<dyn Cluster>>,
    api: Option<Arc<dyn SubscriptionApi>>,
    connector: Option<Arc<dyn StreamConnector>>,
}

impl EventsClientBuilder {
    pub fn new(config: EventsConfig) -> Self {
        Self {
            config,
            cluster: None,
            api: None,
            connector: None,
        }
    }

    /// Uses `cluster` instead of a [`MemberList`] over `config.members`.
    ///
    /// The default subscription API also sends its requests through it.
    pub fn with_cluster(mut self, cluster: Arc<dyn Cluster>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Uses `api` instead of [`HttpSubscriptionApi`].
    pub fn with_subscription_api(mut self, api: Arc<dyn SubscriptionApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Uses `connector` instead of [`SseConnector`].
    pub fn with_connector(mut self, connector: Arc<dyn StreamConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the client. No socket is opened and no request is sent until
    /// the first listener registers.
    ///
    /// Fails only if a default HTTP client cannot be constructed.
    pub fn build(self) -> Result<EventsClient, EventsError> {
        let config = Arc::new(self.config);
        let cluster: Arc<dyn Cluster> = match self.cluster {
            Some(cluster) => cluster,
            None => Arc::new(MemberList::new(&config.members).with_retry_after(config.member_retry)),
        };
        let api: Arc<dyn SubscriptionApi> = match self.api {
            Some(api) => api,
            None => {
                let http = Client::builder()
                    .timeout(config.request_timeout)
                    .build()
                    .map_err(EventsError::HttpClient)?;
                Arc::new(HttpSubscriptionApi::new(
                    http,
                    Arc::clone(&cluster),
                    config.subscriptions_path.clone(),
                ))
            }
        };

        let registry = Arc::new(RwLock::new(ListenerRegistry::new()));
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&registry)));
        let token = CancellationToken::new();

        let manager = match config.transport {
            EventsTransport::Callback => TransportManager::Callback(CallbackTransport::new(
                Arc::clone(&config),
                Arc::clone(&api),
                Arc::clone(&pipeline),
                token.clone(),
            )),
            EventsTransport::Stream => {
                let connector: Arc<dyn StreamConnector> = match self.connector {
                    Some(connector) => connector,
                    None => Arc::new(
                        SseConnector::with_connect_timeout(config.connect_timeout)
                            .map_err(EventsError::HttpClient)?
                            .with_max_line_bytes(config.max_body_bytes),
                    ),
                };
                TransportManager::Stream(StreamTransport::new(
                    cluster,
                    connector,
                    Arc::clone(&pipeline),
                    &config.stream_path,
                    config.reconnect_backoff,
                    token.clone(),
                ))
            }
        };

        tracing::debug!(transport = %config.transport, members = config.members.len(), "events client built");
        Ok(EventsClient::from_inner(Inner {
            config,
            registry,
            manager: Mutex::new(manager),
            api,
            pipeline,
            token,
        }))
    }
}
