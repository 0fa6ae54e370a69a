//! Test doubles shared by the unit tests.
//!
//! - [`payloads`]: a valid wire payload for every [`EventKind`]
//! - [`FakeSubscriptionApi`]: in-memory subscription list that records calls
//! - [`FakeConnector`]: scripted stream connector
//! - [`FakeMarathon`]: loopback `axum` server with the subscription and stream endpoints

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::SubscriptionApi;
use crate::error::{ApiError, StreamError};
use crate::transport::{Frame, FrameStream, StreamConnector};

pub(crate) mod payloads {
    use serde_json::{Value, json};

    use crate::events::EventKind;

    pub(crate) const TIMESTAMP: &str = "2024-05-01T12:00:00.000Z";

    /// A minimal valid payload of `kind`.
    pub(crate) fn of_kind(kind: EventKind) -> String {
        let mut body = match kind {
            EventKind::StatusUpdate => json!({
                "appId": "/web",
                "taskId": "web.1",
                "taskStatus": "TASK_RUNNING",
                "host": "agent-1",
                "ports": [31000],
                "ipAddresses": [{"ipAddress": "10.0.0.7", "protocol": "IPv4"}],
            }),
            EventKind::HealthStatusChanged => json!({"appId": "/web", "taskId": "web.1", "alive": true}),
            EventKind::FailedHealthCheck => json!({"appId": "/web", "taskId": "web.1", "healthCheck": {}}),
            EventKind::AddHealthCheck | EventKind::RemoveHealthCheck => json!({"appId": "/web"}),
            EventKind::ApiRequest => json!({"clientIp": "10.0.0.1", "uri": "/v2/apps/web"}),
            EventKind::FrameworkMessage => json!({"slaveId": "s1", "executorId": "e1", "message": "aGk="}),
            EventKind::Subscribe | EventKind::Unsubscribe => {
                json!({"callbackUrl": "http://10.0.0.5:10001/api/v3/events"})
            }
            EventKind::StreamAttached | EventKind::StreamDetached => {
                json!({"remoteAddress": "10.0.0.5"})
            }
            EventKind::GroupChangeSuccess => json!({"groupId": "/prod", "version": "v1"}),
            EventKind::GroupChangeFailed => json!({"groupId": "/prod", "reason": "conflict"}),
            EventKind::DeploymentSuccess | EventKind::DeploymentFailed => {
                json!({"id": "d-1", "plan": {"id": "d-1"}})
            }
            EventKind::DeploymentInfo
            | EventKind::DeploymentStepSuccess
            | EventKind::DeploymentStepFailure => {
                json!({"plan": {"id": "d-1"}, "currentStep": {"actions": []}})
            }
            EventKind::AppTerminated => json!({"appId": "/web"}),
        };
        if let Value::Object(map) = &mut body {
            map.insert("eventType".into(), Value::from(kind.as_str()));
            map.insert("timestamp".into(), Value::from(TIMESTAMP));
        }
        body.to_string()
    }
}

/// Polls `cond` until it holds, panicking after two seconds.
pub(crate) async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// One recorded subscription API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    List,
    Subscribe(String),
    Unsubscribe(String),
}

#[derive(Default)]
struct ApiState {
    urls: Vec<String>,
    calls: Vec<ApiCall>,
    fail_with: Option<u16>,
}

/// In-memory [`SubscriptionApi`].
#[derive(Default)]
pub(crate) struct FakeSubscriptionApi {
    state: Mutex<ApiState>,
}

impl FakeSubscriptionApi {
    pub(crate) fn with_urls<I: IntoIterator<Item = S>, S: Into<String>>(urls: I) -> Self {
        let api = Self::default();
        api.state.lock().urls = urls.into_iter().map(Into::into).collect();
        api
    }

    /// Every later call answers `status` until cleared with `None`.
    pub(crate) fn set_failure(&self, status: Option<u16>) {
        self.state.lock().fail_with = status;
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.state.lock().urls.clone()
    }

    fn record(&self, call: ApiCall, method: &'static str) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.fail_with {
            Some(status) => Err(ApiError::Status {
                method,
                url: "fake://subscriptions".into(),
                status,
                body: String::new(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SubscriptionApi for FakeSubscriptionApi {
    async fn subscriptions(&self) -> Result<Vec<String>, ApiError> {
        self.record(ApiCall::List, "GET")?;
        Ok(self.urls())
    }

    async fn subscribe(&self, callback_url: &str) -> Result<(), ApiError> {
        self.record(ApiCall::Subscribe(callback_url.to_string()), "POST")?;
        let mut state = self.state.lock();
        if !state.urls.iter().any(|u| u == callback_url) {
            state.urls.push(callback_url.to_string());
        }
        Ok(())
    }

    async fn unsubscribe(&self, callback_url: &str) -> Result<(), ApiError> {
        self.record(ApiCall::Unsubscribe(callback_url.to_string()), "DELETE")?;
        self.state.lock().urls.retain(|u| u != callback_url);
        Ok(())
    }
}

type FrameSender = mpsc::UnboundedSender<Result<Frame, StreamError>>;
type FrameReceiver = mpsc::UnboundedReceiver<Result<Frame, StreamError>>;

enum Script {
    Refuse,
    Open(FrameReceiver),
}

/// Scripted [`StreamConnector`].
///
/// Each URL has a queue of outcomes; a URL with nothing queued refuses.
#[derive(Default)]
pub(crate) struct FakeConnector {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeConnector {
    /// Queues a refused connection for `url`.
    pub(crate) fn refuse(&self, url: &str) {
        self.push(url, Script::Refuse);
    }

    /// Queues an open stream for `url`; frames sent on the returned handle
    /// are yielded by it, and dropping the handle ends it.
    pub(crate) fn open(&self, url: &str) -> FrameSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(url, Script::Open(rx));
        tx
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn push(&self, url: &str, script: Script) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(script);
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, StreamError> {
        self.calls.lock().push(url.to_string());
        let script = self
            .scripts
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Script::Refuse);
        match script {
            Script::Refuse => Err(StreamError::Status {
                url: url.to_string(),
                status: 503,
            }),
            Script::Open(rx) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        }
    }
}

/// A data-only frame carrying `raw`.
pub(crate) fn frame(raw: impl Into<String>) -> Frame {
    Frame {
        event: None,
        data: raw.into(),
        id: None,
    }
}

#[derive(Default)]
struct MarathonState {
    subscriptions: Mutex<Vec<String>>,
    fail_with: Mutex<Option<u16>>,
    streams: Mutex<Vec<mpsc::UnboundedSender<String>>>,
}

/// Loopback stand-in for a cluster member.
///
/// Serves `/v2/eventSubscriptions` (GET, POST, DELETE) and `/v2/events`
/// (server-sent events fed by [`FakeMarathon::push`]).
pub(crate) struct FakeMarathon {
    addr: SocketAddr,
    state: Arc<MarathonState>,
    token: CancellationToken,
}

impl FakeMarathon {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(MarathonState::default());
        let router = Router::new()
            .route(
                "/v2/eventSubscriptions",
                get(list_subscriptions)
                    .post(add_subscription)
                    .delete(remove_subscription),
            )
            .route("/v2/events", get(open_stream))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let shutdown = token.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
        });
        Self { addr, state, token }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Makes the subscription endpoints answer `status`.
    pub(crate) fn fail_with(&self, status: u16) {
        *self.state.fail_with.lock() = Some(status);
    }

    pub(crate) fn subscriptions(&self) -> Vec<String> {
        self.state.subscriptions.lock().clone()
    }

    /// Sends raw SSE text to every open stream.
    pub(crate) fn push(&self, text: &str) {
        self.state
            .streams
            .lock()
            .retain(|tx| tx.send(text.to_string()).is_ok());
    }

    pub(crate) fn stream_count(&self) -> usize {
        let mut streams = self.state.streams.lock();
        streams.retain(|tx| !tx.is_closed());
        streams.len()
    }

    /// Ends every open stream.
    pub(crate) fn close_streams(&self) {
        self.state.streams.lock().clear();
    }
}

impl Drop for FakeMarathon {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackQuery {
    callback_url: String,
}

fn failure(state: &MarathonState) -> Option<Response> {
    let status = (*state.fail_with.lock())?;
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some((code, "injected failure").into_response())
}

async fn list_subscriptions(State(state): State<Arc<MarathonState>>) -> Response {
    if let Some(resp) = failure(&state) {
        return resp;
    }
    let urls = state.subscriptions.lock().clone();
    axum::Json(serde_json::json!({ "callbackUrls": urls })).into_response()
}

async fn add_subscription(
    State(state): State<Arc<MarathonState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(resp) = failure(&state) {
        return resp;
    }
    let mut subs = state.subscriptions.lock();
    if !subs.contains(&query.callback_url) {
        subs.push(query.callback_url.clone());
    }
    axum::Json(serde_json::json!({ "callbackUrl": query.callback_url })).into_response()
}

async fn remove_subscription(
    State(state): State<Arc<MarathonState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(resp) = failure(&state) {
        return resp;
    }
    state.subscriptions.lock().retain(|u| *u != query.callback_url);
    axum::Json(serde_json::json!({ "callbackUrl": query.callback_url })).into_response()
}

async fn open_stream(State(state): State<Arc<MarathonState>>) -> Response {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    state.streams.lock().push(tx);
    let body = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|text| (Ok::<_, std::convert::Infallible>(text), rx))
    });
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(body),
    )
        .into_response()
}
