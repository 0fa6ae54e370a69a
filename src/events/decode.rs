//! # Two-pass payload decoder.
//!
//! ```text
//! raw text ──► pass 1: Envelope { eventType } ──► EventKind::from_wire
//!                 │ parse error → MalformedEvent { kind: None }
//!                 │ unknown name → UnknownEventKind
//!                 ▼
//!          pass 2: full text ──► kind schema ──► Event
//!                 │ parse error → MalformedEvent { kind: Some(..) }
//! ```
//!
//! The decoder is pure: it touches no shared state, so the transports call it
//! from whatever task received the payload.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

use super::event::Event;
use super::kind::EventKind;
use super::payload::EventPayload;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "eventType")]
    event_type: String,
}

/// Decodes one raw payload.
///
/// # Example
/// ```
/// use marathon_events::{decode, EventKind, EventPayload};
///
/// let raw = r#"{"eventType":"app_terminated_event","timestamp":"2024-01-01T00:00:00.000Z","appId":"/web"}"#;
/// let event = decode(raw).unwrap();
/// assert_eq!(event.kind(), EventKind::AppTerminated);
/// assert!(matches!(event.payload(), EventPayload::AppTerminated(p) if p.app_id == "/web"));
/// ```
pub fn decode(raw: &str) -> Result<Event, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw)
        .map_err(|source| DecodeError::MalformedEvent { kind: None, source })?;

    let kind = EventKind::from_wire(&envelope.event_type)
        .ok_or(DecodeError::UnknownEventKind(envelope.event_type))?;

    let payload = decode_payload(kind, raw)
        .map_err(|source| DecodeError::MalformedEvent { kind: Some(kind), source })?;

    Ok(Event::new(kind, payload))
}

fn decode_payload(kind: EventKind, raw: &str) -> Result<EventPayload, serde_json::Error> {
    use EventPayload as P;

    Ok(match kind {
        EventKind::StatusUpdate => P::StatusUpdate(parse(raw)?),
        EventKind::HealthStatusChanged => P::HealthStatusChanged(parse(raw)?),
        EventKind::FailedHealthCheck => P::FailedHealthCheck(parse(raw)?),
        EventKind::AddHealthCheck => P::AddHealthCheck(parse(raw)?),
        EventKind::RemoveHealthCheck => P::RemoveHealthCheck(parse(raw)?),
        EventKind::ApiRequest => P::ApiRequest(parse(raw)?),
        EventKind::FrameworkMessage => P::FrameworkMessage(parse(raw)?),
        EventKind::Subscribe => P::Subscribe(parse(raw)?),
        EventKind::Unsubscribe => P::Unsubscribe(parse(raw)?),
        EventKind::StreamAttached => P::StreamAttached(parse(raw)?),
        EventKind::StreamDetached => P::StreamDetached(parse(raw)?),
        EventKind::GroupChangeSuccess => P::GroupChangeSuccess(parse(raw)?),
        EventKind::GroupChangeFailed => P::GroupChangeFailed(parse(raw)?),
        EventKind::DeploymentSuccess => P::DeploymentSuccess(parse(raw)?),
        EventKind::DeploymentFailed => P::DeploymentFailed(parse(raw)?),
        EventKind::DeploymentInfo => P::DeploymentInfo(parse(raw)?),
        EventKind::DeploymentStepSuccess => P::DeploymentStepSuccess(parse(raw)?),
        EventKind::DeploymentStepFailure => P::DeploymentStepFailure(parse(raw)?),
        EventKind::AppTerminated => P::AppTerminated(parse(raw)?),
    })
}

#[inline]
fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}
