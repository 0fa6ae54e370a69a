//! Kind-specific payload schemas.
//!
//! Field names follow the wire format (camelCase). Resource documents the
//! events merely carry along (app definitions, deployment plans, steps, health
//! check definitions) stay opaque [`serde_json::Value`]s.

use serde::Deserialize;
use serde_json::Value;

/// `status_update_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub timestamp: String,
    pub app_id: String,
    pub task_id: String,
    pub task_status: String,
    #[serde(default)]
    pub slave_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    #[serde(default)]
    pub version: String,
}

/// One task address inside a [`StatusUpdate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    pub ip_address: String,
    #[serde(default)]
    pub protocol: String,
}

/// `health_status_changed_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusChanged {
    pub timestamp: String,
    pub app_id: String,
    pub task_id: String,
    pub alive: bool,
    #[serde(default)]
    pub version: String,
}

/// `failed_health_check_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedHealthCheck {
    pub timestamp: String,
    pub app_id: String,
    pub task_id: String,
    #[serde(default)]
    pub health_check: Value,
}

/// `add_health_check_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHealthCheck {
    pub timestamp: String,
    pub app_id: String,
    #[serde(default)]
    pub health_check: Value,
}

/// `remove_health_check_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveHealthCheck {
    pub timestamp: String,
    pub app_id: String,
}

/// `api_post_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub timestamp: String,
    #[serde(default)]
    pub client_ip: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub app_definition: Value,
}

/// `framework_message_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkMessage {
    pub timestamp: String,
    #[serde(default)]
    pub slave_id: String,
    #[serde(default)]
    pub executor_id: String,
    #[serde(default)]
    pub message: String,
}

/// `subscribe_event` and `unsubscribe_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChange {
    pub timestamp: String,
    pub callback_url: String,
    #[serde(default)]
    pub client_ip: String,
}

/// `event_stream_attached` and `event_stream_detached`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChange {
    pub timestamp: String,
    #[serde(default)]
    pub remote_address: String,
}

/// `group_change_success`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChangeSuccess {
    pub timestamp: String,
    pub group_id: String,
    #[serde(default)]
    pub version: String,
}

/// `group_change_failed`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChangeFailed {
    pub timestamp: String,
    pub group_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub reason: String,
}

/// `deployment_success` and `deployment_failed`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutcome {
    pub timestamp: String,
    pub id: String,
    #[serde(default)]
    pub plan: Value,
}

/// `deployment_info`, `deployment_step_success` and `deployment_step_failure`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProgress {
    pub timestamp: String,
    pub plan: Value,
    #[serde(default)]
    pub current_step: Value,
}

/// `app_terminated_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTerminated {
    pub timestamp: String,
    pub app_id: String,
}

/// Decoded body of an event, one variant per [`EventKind`](crate::EventKind).
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    StatusUpdate(StatusUpdate),
    HealthStatusChanged(HealthStatusChanged),
    FailedHealthCheck(FailedHealthCheck),
    AddHealthCheck(AddHealthCheck),
    RemoveHealthCheck(RemoveHealthCheck),
    ApiRequest(ApiRequest),
    FrameworkMessage(FrameworkMessage),
    Subscribe(SubscriptionChange),
    Unsubscribe(SubscriptionChange),
    StreamAttached(StreamChange),
    StreamDetached(StreamChange),
    GroupChangeSuccess(GroupChangeSuccess),
    GroupChangeFailed(GroupChangeFailed),
    DeploymentSuccess(DeploymentOutcome),
    DeploymentFailed(DeploymentOutcome),
    DeploymentInfo(DeploymentProgress),
    DeploymentStepSuccess(DeploymentProgress),
    DeploymentStepFailure(DeploymentProgress),
    AppTerminated(AppTerminated),
}

impl EventPayload {
    /// Wire timestamp shared by every payload.
    pub fn timestamp(&self) -> &str {
        match self {
            EventPayload::StatusUpdate(p) => &p.timestamp,
            EventPayload::HealthStatusChanged(p) => &p.timestamp,
            EventPayload::FailedHealthCheck(p) => &p.timestamp,
            EventPayload::AddHealthCheck(p) => &p.timestamp,
            EventPayload::RemoveHealthCheck(p) => &p.timestamp,
            EventPayload::ApiRequest(p) => &p.timestamp,
            EventPayload::FrameworkMessage(p) => &p.timestamp,
            EventPayload::Subscribe(p) | EventPayload::Unsubscribe(p) => &p.timestamp,
            EventPayload::StreamAttached(p) | EventPayload::StreamDetached(p) => &p.timestamp,
            EventPayload::GroupChangeSuccess(p) => &p.timestamp,
            EventPayload::GroupChangeFailed(p) => &p.timestamp,
            EventPayload::DeploymentSuccess(p) | EventPayload::DeploymentFailed(p) => &p.timestamp,
            EventPayload::DeploymentInfo(p)
            | EventPayload::DeploymentStepSuccess(p)
            | EventPayload::DeploymentStepFailure(p) => &p.timestamp,
            EventPayload::AppTerminated(p) => &p.timestamp,
        }
    }

    /// Application id, for the kinds that name one.
    pub fn app_id(&self) -> Option<&str> {
        match self {
            EventPayload::StatusUpdate(p) => Some(&p.app_id),
            EventPayload::HealthStatusChanged(p) => Some(&p.app_id),
            EventPayload::FailedHealthCheck(p) => Some(&p.app_id),
            EventPayload::AddHealthCheck(p) => Some(&p.app_id),
            EventPayload::RemoveHealthCheck(p) => Some(&p.app_id),
            EventPayload::AppTerminated(p) => Some(&p.app_id),
            _ => None,
        }
    }
}
