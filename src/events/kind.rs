//! # Event kinds and the discriminator registry.
//!
//! Every payload pushed by Marathon carries an `eventType` discriminator.
//! [`EventKind`] is the closed set of discriminators this client understands;
//! each kind owns one bit so that listeners can select kinds with a plain
//! `u32` mask (see [`filter`]).
//!
//! ```rust
//! use marathon_events::{EventKind, filter};
//!
//! assert_eq!(EventKind::from_wire("status_update_event"), Some(EventKind::StatusUpdate));
//! assert_eq!(EventKind::StatusUpdate.bit(), 0x1);
//! assert!(filter::APPLICATIONS & EventKind::StatusUpdate.bit() != 0);
//! assert_eq!(EventKind::from_wire("no_such_event"), None);
//! ```

use std::fmt;

/// Classification of decoded events.
///
/// Variant order fixes the bit values; append new kinds at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `status_update_event`: a task changed state.
    StatusUpdate,
    /// `health_status_changed_event`: a task's health check flipped.
    HealthStatusChanged,
    /// `failed_health_check_event`.
    FailedHealthCheck,
    /// `add_health_check_event`.
    AddHealthCheck,
    /// `remove_health_check_event`.
    RemoveHealthCheck,
    /// `api_post_event`: an app definition was submitted through the API.
    ApiRequest,
    /// `framework_message_event`.
    FrameworkMessage,
    /// `subscribe_event`: a callback URL was registered.
    Subscribe,
    /// `unsubscribe_event`: a callback URL was removed.
    Unsubscribe,
    /// `event_stream_attached`.
    StreamAttached,
    /// `event_stream_detached`.
    StreamDetached,
    /// `group_change_success`.
    GroupChangeSuccess,
    /// `group_change_failed`.
    GroupChangeFailed,
    /// `deployment_success`.
    DeploymentSuccess,
    /// `deployment_failed`.
    DeploymentFailed,
    /// `deployment_info`.
    DeploymentInfo,
    /// `deployment_step_success`.
    DeploymentStepSuccess,
    /// `deployment_step_failure`.
    DeploymentStepFailure,
    /// `app_terminated_event`.
    AppTerminated,
}

/// Discriminator registry: wire name for every kind, in bit order.
const REGISTRY: [(&str, EventKind); 19] = [
    ("status_update_event", EventKind::StatusUpdate),
    ("health_status_changed_event", EventKind::HealthStatusChanged),
    ("failed_health_check_event", EventKind::FailedHealthCheck),
    ("add_health_check_event", EventKind::AddHealthCheck),
    ("remove_health_check_event", EventKind::RemoveHealthCheck),
    ("api_post_event", EventKind::ApiRequest),
    ("framework_message_event", EventKind::FrameworkMessage),
    ("subscribe_event", EventKind::Subscribe),
    ("unsubscribe_event", EventKind::Unsubscribe),
    ("event_stream_attached", EventKind::StreamAttached),
    ("event_stream_detached", EventKind::StreamDetached),
    ("group_change_success", EventKind::GroupChangeSuccess),
    ("group_change_failed", EventKind::GroupChangeFailed),
    ("deployment_success", EventKind::DeploymentSuccess),
    ("deployment_failed", EventKind::DeploymentFailed),
    ("deployment_info", EventKind::DeploymentInfo),
    ("deployment_step_success", EventKind::DeploymentStepSuccess),
    ("deployment_step_failure", EventKind::DeploymentStepFailure),
    ("app_terminated_event", EventKind::AppTerminated),
];

impl EventKind {
    /// Looks up a wire discriminator.
    pub fn from_wire(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(wire, _)| *wire == name)
            .map(|(_, kind)| *kind)
    }

    /// Wire discriminator of this kind.
    pub fn as_str(self) -> &'static str {
        REGISTRY[self as usize].0
    }

    /// Filter bit of this kind.
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// True if `mask` selects this kind.
    #[inline]
    pub fn matches(self, mask: u32) -> bool {
        self.bit() & mask != 0
    }

    /// Every known kind, in bit order.
    pub fn all() -> impl Iterator<Item = EventKind> {
        REGISTRY.iter().map(|(_, kind)| *kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ready-made listener filters.
pub mod filter {
    use super::EventKind;

    /// Every event kind.
    pub const ALL: u32 = (1 << 19) - 1;

    /// Task and application lifecycle.
    pub const APPLICATIONS: u32 = bit(EventKind::StatusUpdate)
        | bit(EventKind::HealthStatusChanged)
        | bit(EventKind::FailedHealthCheck)
        | bit(EventKind::AppTerminated);

    /// Health check changes.
    pub const HEALTH_CHECKS: u32 = bit(EventKind::HealthStatusChanged)
        | bit(EventKind::FailedHealthCheck)
        | bit(EventKind::AddHealthCheck)
        | bit(EventKind::RemoveHealthCheck);

    /// Deployment progress and outcome.
    pub const DEPLOYMENTS: u32 = bit(EventKind::DeploymentSuccess)
        | bit(EventKind::DeploymentFailed)
        | bit(EventKind::DeploymentInfo)
        | bit(EventKind::DeploymentStepSuccess)
        | bit(EventKind::DeploymentStepFailure);

    /// Callback subscription changes.
    pub const SUBSCRIPTIONS: u32 = bit(EventKind::Subscribe) | bit(EventKind::Unsubscribe);

    /// Event stream attach/detach notices.
    pub const STREAM: u32 = bit(EventKind::StreamAttached) | bit(EventKind::StreamDetached);

    const fn bit(kind: EventKind) -> u32 {
        1 << (kind as u32)
    }
}
