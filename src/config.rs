//! # Events client configuration.
//!
//! Provides [`EventsConfig`], the settings consumed by the transports, and
//! [`EventsTransport`], the choice between push (callback) and pull (stream)
//! delivery.
//!
//! ## Sentinel values
//! - `port = 0` → bind an ephemeral port; the bound port goes into the callback URL
//! - `callback_url = Some("")` → treated as unset
//! - `listen_address = None` → resolve the address from `interface`

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cluster::DEFAULT_MEMBER_RETRY;
use crate::error::EventsError;
use crate::policies::BackoffPolicy;

/// Delivery transport used to receive events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventsTransport {
    /// Marathon POSTs each event to an HTTP endpoint hosted by this client.
    #[default]
    Callback,
    /// The client holds a server-sent-events stream open against one member.
    Stream,
}

impl FromStr for EventsTransport {
    type Err = EventsError;

    /// Parses `callback`, `stream` or `sse` (case-insensitive).
    ///
    /// ```
    /// use marathon_events::{EventsError, EventsTransport};
    ///
    /// assert_eq!("SSE".parse::<EventsTransport>().unwrap(), EventsTransport::Stream);
    /// assert!(matches!(
    ///     "websocket".parse::<EventsTransport>(),
    ///     Err(EventsError::UnsupportedTransport(_))
    /// ));
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "callback" => Ok(EventsTransport::Callback),
            "stream" | "sse" => Ok(EventsTransport::Stream),
            _ => Err(EventsError::UnsupportedTransport(s.to_string())),
        }
    }
}

impl fmt::Display for EventsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventsTransport::Callback => f.write_str("callback"),
            EventsTransport::Stream => f.write_str("stream"),
        }
    }
}

/// Configuration for an [`EventsClient`](crate::EventsClient).
///
/// ## Field semantics
/// - `members`: base URLs of the cluster members (`http://host:port`)
/// - `transport`: which transport the first listener activates
/// - `interface`, `listen_address`, `port`: where the callback listener binds
/// - `callback_url`: public base URL announced instead of the bound address
/// - `*_path`: service endpoints; defaults match Marathon's v2 API
/// - `reconnect_backoff`: pacing of stream failover attempts
/// - `member_retry`: how long a failed member sits out
#[derive(Clone, Debug)]
pub struct EventsConfig {
    /// Cluster member base URLs. Used by the default cluster implementation.
    pub members: Vec<String>,

    pub transport: EventsTransport,

    /// Network interface whose address the callback listener binds.
    pub interface: String,

    /// Explicit bind address; skips interface lookup when set.
    pub listen_address: Option<IpAddr>,

    /// Callback listener port.
    pub port: u16,

    /// Public base URL for the callback, e.g. when running behind NAT.
    ///
    /// The callback path is appended to it.
    pub callback_url: Option<String>,

    /// Path the callback listener serves and announces.
    pub callback_path: String,

    /// Subscription API path on a member.
    pub subscriptions_path: String,

    /// Event stream path on a member.
    pub stream_path: String,

    /// Timeout for subscription API calls.
    pub request_timeout: Duration,

    /// Time allowed to read one callback request: headers, then body.
    pub callback_read_timeout: Duration,

    /// Time allowed to write the callback response.
    pub callback_write_timeout: Duration,

    /// Largest callback body accepted; larger bodies are discarded.
    ///
    /// Also caps a single event stream line; a longer line ends the stream.
    pub max_body_bytes: usize,

    /// Connect timeout for the event stream.
    pub connect_timeout: Duration,

    pub reconnect_backoff: BackoffPolicy,

    /// Delay before a member marked down is tried again by the default cluster.
    pub member_retry: Duration,
}

impl EventsConfig {
    /// Public callback base URL, if one is configured and non-empty.
    #[inline]
    pub fn callback_base(&self) -> Option<&str> {
        self.callback_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// Sets the transport from its textual name (`callback`, `stream`, `sse`).
    pub fn with_transport(mut self, transport: &str) -> Result<Self, EventsError> {
        self.transport = transport.parse()?;
        Ok(self)
    }
}

impl Default for EventsConfig {
    /// Default configuration:
    ///
    /// - `members = ["http://127.0.0.1:8080"]`
    /// - `transport = Callback` on `eth0:10001`, path `/api/v3/events`
    /// - `request_timeout = 10s`, `callback_read_timeout = 10s`,
    ///   `callback_write_timeout = 10s`
    /// - `max_body_bytes = 8 MiB`, `connect_timeout = 5s`
    /// - `reconnect_backoff = BackoffPolicy::default()`, `member_retry = 5s`
    fn default() -> Self {
        Self {
            members: vec!["http://127.0.0.1:8080".to_string()],
            transport: EventsTransport::default(),
            interface: "eth0".to_string(),
            listen_address: None,
            port: 10001,
            callback_url: None,
            callback_path: "/api/v3/events".to_string(),
            subscriptions_path: "/v2/eventSubscriptions".to_string(),
            stream_path: "/v2/events".to_string(),
            request_timeout: Duration::from_secs(10),
            callback_read_timeout: Duration::from_secs(10),
            callback_write_timeout: Duration::from_secs(10),
            max_body_bytes: 8 << 20,
            connect_timeout: Duration::from_secs(5),
            reconnect_backoff: BackoffPolicy::default(),
            member_retry: DEFAULT_MEMBER_RETRY,
        }
    }
}
