//! Error types used by the events client and its transports.
//!
//! This module defines four error enums:
//!
//! - [`EventsError`]: errors returned synchronously from listener registration
//!   (transport activation, subscription calls, shutdown).
//! - [`DecodeError`]: a payload could not be turned into an [`Event`](crate::Event).
//!   Never returned to consumers: the pipeline logs it and discards the payload.
//! - [`ApiError`]: failures of the subscription REST calls.
//! - [`StreamError`]: failures opening or reading the server-push event stream.
//!
//! Every type provides `as_label` for logs.

use std::net::SocketAddr;

use thiserror::Error;

use crate::events::EventKind;

/// # Errors surfaced to callers of the events client.
///
/// Anything that goes wrong *after* a transport is active is only logged;
/// these variants cover the registration-time path.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventsError {
    /// The configured network interface has no usable address.
    #[error("unable to resolve an address for interface '{interface}': {reason}")]
    InterfaceResolution {
        /// Interface name from the configuration.
        interface: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// The callback listener could not bind its socket.
    #[error("failed to bind the events listener on {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Listing, adding or removing a callback subscription failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Every cluster member is marked down.
    #[error("no healthy cluster member available")]
    NoHealthyMember,

    /// The configured transport name is not one this client implements.
    #[error("the events transport '{0}' is not supported")]
    UnsupportedTransport(String),

    /// The client has been shut down.
    #[error("events client has been shut down")]
    Closed,

    /// The default HTTP clients could not be constructed.
    #[error("failed to build the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl EventsError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use marathon_events::EventsError;
    ///
    /// assert_eq!(EventsError::NoHealthyMember.as_label(), "no_healthy_member");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventsError::InterfaceResolution { .. } => "interface_resolution",
            EventsError::Bind { .. } => "listener_bind",
            EventsError::Api(e) => e.as_label(),
            EventsError::NoHealthyMember => "no_healthy_member",
            EventsError::UnsupportedTransport(_) => "unsupported_transport",
            EventsError::Closed => "client_closed",
            EventsError::HttpClient(_) => "http_client",
        }
    }
}

/// # Payload decoding failures.
///
/// Decoding fails closed: no variant carries a partially built event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The discriminator names a kind missing from the registry.
    #[error("unknown event kind '{0}'")]
    UnknownEventKind(String),

    /// The payload did not parse, either as an envelope (`kind == None`)
    /// or as the schema selected by its discriminator.
    #[error("malformed {} payload: {source}", .kind.map_or("event", EventKind::as_str))]
    MalformedEvent {
        /// Kind selected by the first pass, if it got that far.
        kind: Option<EventKind>,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DecodeError::UnknownEventKind(_) => "unknown_event_kind",
            DecodeError::MalformedEvent { kind: None, .. } => "malformed_envelope",
            DecodeError::MalformedEvent { .. } => "malformed_event",
        }
    }
}

/// # Subscription REST failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{method} {url} answered {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not the expected JSON document.
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// No cluster member was available to send the request to.
    #[error("no cluster member available for {method} {path}")]
    NoMember { method: &'static str, path: String },
}

impl ApiError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiError::Request { .. } => "api_request",
            ApiError::Status { .. } => "api_status",
            ApiError::Decode { .. } => "api_decode",
            ApiError::NoMember { .. } => "api_no_member",
        }
    }
}

/// # Event stream failures.
///
/// `Connect` and `Status` are returned by a connector and trigger failover;
/// `Read` arrives inside an open stream and is only logged.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("event stream request to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("event stream at {url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("event stream read failed: {0}")]
    Read(String),
}

impl StreamError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Connect { .. } => "stream_connect",
            StreamError::Status { .. } => "stream_status",
            StreamError::Read(_) => "stream_read",
        }
    }
}
