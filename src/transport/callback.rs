//! # Callback transport: push delivery to a locally hosted endpoint.
//!
//! ```text
//! activate()
//!   ├─ server bound? ── no ──► resolve address (listen_address | interface)
//!   │                          bind TcpListener  (EventsError::Bind)
//!   │                          spawn accept loop (until shutdown)
//!   ├─ url = <callback base><path> | http://<bound addr><path>
//!   └─ GET subscriptions ── url present? ── no ──► POST subscribe
//!
//! member ── POST <path> ──► receive() ──► Pipeline::handle ──► listeners
//!                              └─ always 200
//!
//! deactivate()  (last listener removed)
//!   └─ DELETE subscribe(url); the local server keeps running
//! ```
//!
//! State: `Inactive → Activating → Active → Deactivating → Inactive`.
//! A failed activation returns to `Inactive`; a failed unsubscribe stays `Active`.
//!
//! One request per connection: headers within the read timeout, the whole
//! exchange within read + write timeout.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::any;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::SubscriptionApi;
use crate::config::EventsConfig;
use crate::core::Pipeline;
use crate::error::EventsError;
use crate::policies::BackoffPolicy;

/// Activation state of the callback transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActivationState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

pub(crate) struct CallbackTransport {
    config: Arc<EventsConfig>,
    api: Arc<dyn SubscriptionApi>,
    pipeline: Arc<Pipeline>,
    token: CancellationToken,
    state: ActivationState,
    local_addr: Option<SocketAddr>,
    url: Option<String>,
}

impl CallbackTransport {
    pub(crate) fn new(
        config: Arc<EventsConfig>,
        api: Arc<dyn SubscriptionApi>,
        pipeline: Arc<Pipeline>,
        token: CancellationToken,
    ) -> Self {
        Self {
            config,
            api,
            pipeline,
            token,
            state: ActivationState::Inactive,
            local_addr: None,
            url: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ActivationState {
        self.state
    }

    /// Callback URL computed by the last activation.
    pub(crate) fn callback_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Binds the endpoint (once) and makes sure the callback URL is subscribed.
    pub(crate) async fn activate(&mut self) -> Result<(), EventsError> {
        if self.state == ActivationState::Active {
            tracing::debug!(url = ?self.url, "callback transport already active");
            return Ok(());
        }
        self.state = ActivationState::Activating;
        match self.subscribe().await {
            Ok(()) => {
                self.state = ActivationState::Active;
                Ok(())
            }
            Err(e) => {
                self.state = ActivationState::Inactive;
                Err(e)
            }
        }
    }

    /// Removes the callback URL from the subscription list.
    pub(crate) async fn deactivate(&mut self) -> Result<(), EventsError> {
        if self.state != ActivationState::Active {
            tracing::debug!(state = ?self.state, "callback transport not active, nothing to unsubscribe");
            return Ok(());
        }
        let Some(url) = self.url.clone() else {
            self.state = ActivationState::Inactive;
            return Ok(());
        };

        self.state = ActivationState::Deactivating;
        match self.api.unsubscribe(&url).await {
            Ok(()) => {
                self.state = ActivationState::Inactive;
                tracing::info!(%url, "callback unsubscribed");
                Ok(())
            }
            Err(e) => {
                self.state = ActivationState::Active;
                tracing::warn!(%url, error = %e, "callback unsubscribe failed");
                Err(e.into())
            }
        }
    }

    async fn subscribe(&mut self) -> Result<(), EventsError> {
        let addr = match self.local_addr {
            Some(addr) => addr,
            None => {
                let addr = self.start_server().await?;
                self.local_addr = Some(addr);
                addr
            }
        };

        let path = route_path(&self.config.callback_path);
        let url = match self.config.callback_base() {
            Some(base) => format!("{base}{path}"),
            None => format!("http://{addr}{path}"),
        };
        self.url = Some(url.clone());

        let current = self.api.subscriptions().await?;
        if current.iter().any(|u| *u == url) {
            tracing::debug!(%url, "callback already subscribed");
            return Ok(());
        }
        self.api.subscribe(&url).await?;
        tracing::info!(%url, "callback subscribed");
        Ok(())
    }

    async fn start_server(&self) -> Result<SocketAddr, EventsError> {
        let ip = resolve_address(&self.config)?;
        let addr = SocketAddr::new(ip, self.config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EventsError::Bind { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| EventsError::Bind { addr, source })?;

        let state = Receiver {
            pipeline: Arc::clone(&self.pipeline),
            read_timeout: self.config.callback_read_timeout,
            max_body_bytes: self.config.max_body_bytes,
        };
        let router = Router::new()
            .route(&route_path(&self.config.callback_path), any(receive))
            .with_state(state);

        let timeouts = Timeouts {
            read: self.config.callback_read_timeout,
            write: self.config.callback_write_timeout,
        };
        tokio::spawn(serve(
            listener,
            bound,
            router,
            timeouts,
            self.token.clone(),
            self.config.reconnect_backoff,
        ));
        tracing::info!(addr = %bound, path = %self.config.callback_path, "callback listener bound");
        Ok(bound)
    }
}

const MIN_ACCEPT_WAIT: Duration = Duration::from_millis(10);

/// Per-connection limits of the callback listener.
#[derive(Clone, Copy, Debug)]
struct Timeouts {
    read: Duration,
    write: Duration,
}

/// Accepts connections until `token` is cancelled.
///
/// Each connection carries one request. Its headers must arrive within the
/// read timeout and the whole exchange must finish within read plus write
/// timeout, after which the connection is dropped.
async fn serve(
    listener: TcpListener,
    addr: SocketAddr,
    router: Router,
    timeouts: Timeouts,
    token: CancellationToken,
    backoff: BackoffPolicy,
) {
    let mut http = http1::Builder::new();
    http.timer(TokioTimer::new())
        .header_read_timeout(timeouts.read)
        .keep_alive(false);
    let service = TowerToHyperService::new(router);
    let deadline = timeouts.read + timeouts.write;
    let mut attempt = 0u32;

    loop {
        let accepted = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(%addr, "callback listener stopped");
                return;
            }
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(accepted) => {
                attempt = 0;
                accepted
            }
            // the socket stays bound; errors such as EMFILE clear on their own
            Err(e) => {
                let delay = backoff.next(attempt).max(MIN_ACCEPT_WAIT);
                attempt = attempt.saturating_add(1);
                tracing::warn!(%addr, error = %e, retry_in = ?delay, "callback accept failed");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }
        };

        let conn = http.serve_connection(TokioIo::new(stream), service.clone());
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = tokio::time::timeout(deadline, conn) => match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::debug!(%peer, error = %e, "callback connection closed with error"),
                    Err(_) => tracing::warn!(%peer, timeout = ?deadline, "callback connection timed out"),
                },
            }
        });
    }
}

#[derive(Clone)]
struct Receiver {
    pipeline: Arc<Pipeline>,
    read_timeout: Duration,
    max_body_bytes: usize,
}

async fn receive(State(rx): State<Receiver>, body: Body) -> StatusCode {
    let read = axum::body::to_bytes(body, rx.max_body_bytes);
    let bytes = match tokio::time::timeout(rx.read_timeout, read).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to read callback body");
            return StatusCode::OK;
        }
        Err(_) => {
            tracing::warn!(timeout = ?rx.read_timeout, "callback body read timed out");
            return StatusCode::OK;
        }
    };
    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            rx.pipeline.handle(text).await;
        }
        Err(e) => tracing::warn!(error = %e, "callback body is not UTF-8"),
    }
    StatusCode::OK
}

/// Address the callback listener binds: `listen_address`, else the first
/// address of `interface` (IPv4 preferred).
pub(crate) fn resolve_address(config: &EventsConfig) -> Result<IpAddr, EventsError> {
    if let Some(ip) = config.listen_address {
        return Ok(ip);
    }
    let interfaces = if_addrs::get_if_addrs().map_err(|e| EventsError::InterfaceResolution {
        interface: config.interface.clone(),
        reason: e.to_string(),
    })?;

    let mut addrs: Vec<IpAddr> = interfaces
        .iter()
        .filter(|i| i.name == config.interface)
        .map(|i| i.ip())
        .collect();
    addrs.sort_by_key(IpAddr::is_ipv6);
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| EventsError::InterfaceResolution {
            interface: config.interface.clone(),
            reason: "no such interface or it has no address".to_string(),
        })
}

fn route_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
