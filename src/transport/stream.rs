//! # Stream transport: pull delivery over a persistent server-push connection.
//!
//! ```text
//! activate() ── started? ── yes ──► no-op
//!     │
//!     ▼ connect loop
//!   member() ── None ──► EventsError::NoHealthyMember
//!     │
//!   connector.connect(<member>/<stream_path>)
//!     ├─ Err ──► mark_down(member), backoff, next member
//!     └─ Ok  ──► spawn read loop, started = true
//!
//! read loop
//!   frame ──► Pipeline::handle(frame.data)
//!   Err   ──► warn, keep reading
//!   end   ──► connect loop again (in background, forever until shutdown)
//! ```
//!
//! There is no deactivation: once started, the loop runs until the client
//! shuts down.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::Cluster;
use crate::core::Pipeline;
use crate::error::EventsError;
use crate::policies::BackoffPolicy;

use super::connector::{FrameStream, StreamConnector};

pub(crate) struct StreamTransport {
    shared: Arc<Shared>,
    started: bool,
}

struct Shared {
    cluster: Arc<dyn Cluster>,
    connector: Arc<dyn StreamConnector>,
    pipeline: Arc<Pipeline>,
    path: String,
    backoff: BackoffPolicy,
    token: CancellationToken,
}

impl StreamTransport {
    pub(crate) fn new(
        cluster: Arc<dyn Cluster>,
        connector: Arc<dyn StreamConnector>,
        pipeline: Arc<Pipeline>,
        path: &str,
        backoff: BackoffPolicy,
        token: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                cluster,
                connector,
                pipeline,
                path: path.trim_start_matches('/').to_string(),
                backoff,
                token,
            }),
            started: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    /// Connects to the first member that accepts and starts the read loop.
    ///
    /// Returns once a stream is open; fails only when no member is healthy.
    pub(crate) async fn activate(&mut self) -> Result<(), EventsError> {
        if self.started {
            tracing::debug!("event stream already started");
            return Ok(());
        }
        let (member, stream) = self.shared.connect().await?;
        self.started = true;
        tokio::spawn(Arc::clone(&self.shared).run(member, stream));
        Ok(())
    }
}

impl Shared {
    async fn connect(&self) -> Result<(String, FrameStream), EventsError> {
        let mut attempt = 0u32;
        loop {
            if self.token.is_cancelled() {
                return Err(EventsError::Closed);
            }
            let member = self.cluster.member().ok_or(EventsError::NoHealthyMember)?;
            let url = format!("{member}/{}", self.path);

            match self.connector.connect(&url).await {
                Ok(stream) => {
                    tracing::info!(%url, "event stream connected");
                    return Ok((member, stream));
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, label = e.as_label(), "event stream connect failed");
                    self.cluster.mark_down(&member);
                }
            }

            let delay = self.backoff.next(attempt);
            attempt = attempt.saturating_add(1);
            if !delay.is_zero() {
                tokio::select! {
                    _ = self.token.cancelled() => return Err(EventsError::Closed),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    async fn run(self: Arc<Self>, mut member: String, mut stream: FrameStream) {
        loop {
            self.read(&member, &mut stream).await;
            if self.token.is_cancelled() {
                tracing::debug!(%member, "event stream stopped");
                return;
            }
            tracing::warn!(%member, "event stream ended, reconnecting");
            match self.reconnect().await {
                Some((next, opened)) => {
                    member = next;
                    stream = opened;
                }
                None => return,
            }
        }
    }

    async fn read(&self, member: &str, stream: &mut FrameStream) {
        loop {
            let next = tokio::select! {
                _ = self.token.cancelled() => return,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(frame)) => {
                    self.pipeline.handle(&frame.data).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(member, error = %e, label = e.as_label(), "event stream frame error");
                }
                None => return,
            }
        }
    }

    /// Runs the connect loop until a stream opens or the client shuts down.
    async fn reconnect(&self) -> Option<(String, FrameStream)> {
        let mut round = 0u32;
        loop {
            match self.connect().await {
                Ok(opened) => return Some(opened),
                Err(EventsError::Closed) => return None,
                Err(e) => {
                    let delay = self.backoff.next(round).max(MIN_IDLE_WAIT);
                    round = round.saturating_add(1);
                    tracing::warn!(error = %e, retry_in = ?delay, "event stream reconnect failed");
                    tokio::select! {
                        _ = self.token.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

// Floor for the wait between reconnect rounds while no member is healthy.
const MIN_IDLE_WAIT: std::time::Duration = std::time::Duration::from_millis(10);

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::RwLock;

    use super::*;
    use crate::EventKind;
    use crate::cluster::MemberList;
    use crate::listeners::{ListenerRegistry, listener};
    use crate::testing::{FakeConnector, FakeMarathon, eventually, frame, payloads};
    use crate::transport::SseConnector;

    const A: &str = "http://member-a:8080";
    const B: &str = "http://member-b:8080";

    struct Fixture {
        transport: StreamTransport,
        cluster: Arc<MemberList>,
        registry: Arc<RwLock<ListenerRegistry>>,
        token: CancellationToken,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            self.token.cancel();
        }
    }

    fn fixture(members: &[&str], connector: Arc<dyn StreamConnector>) -> Fixture {
        fixture_with(Arc::new(MemberList::new(members.iter().copied())), connector)
    }

    fn fixture_with(cluster: Arc<MemberList>, connector: Arc<dyn StreamConnector>) -> Fixture {
        let registry = Arc::new(RwLock::new(ListenerRegistry::new()));
        let pipeline = Arc::new(Pipeline::new(registry.clone()));
        let token = CancellationToken::new();
        let transport = StreamTransport::new(
            cluster.clone() as Arc<dyn Cluster>,
            connector,
            pipeline,
            "/v2/events",
            BackoffPolicy::none(),
            token.clone(),
        );
        Fixture {
            transport,
            cluster,
            registry,
            token,
        }
    }

    #[tokio::test]
    async fn fails_over_to_the_next_member() {
        let connector = Arc::new(FakeConnector::default());
        connector.refuse(&format!("{A}/v2/events"));
        let frames = connector.open(&format!("{B}/v2/events"));
        let mut f = fixture(&[A, B], connector.clone());
        let (handle, mut rx) = listener(8);
        f.registry.write().await.add(&handle, crate::filter::ALL);

        f.transport.activate().await.unwrap();

        assert_eq!(f.cluster.healthy(), vec![B.to_string()]);
        assert_eq!(
            connector.calls(),
            vec![format!("{A}/v2/events"), format!("{B}/v2/events")]
        );

        frames.send(Ok(frame(payloads::of_kind(EventKind::DeploymentSuccess)))).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::DeploymentSuccess);
    }

    #[tokio::test]
    async fn no_healthy_member_fails_activation() {
        let connector = Arc::new(FakeConnector::default());
        let mut f = fixture(&[A, B], connector.clone());

        let err = f.transport.activate().await.unwrap_err();

        assert!(matches!(err, EventsError::NoHealthyMember));
        assert!(!f.transport.is_started());
        assert_eq!(connector.calls().len(), 2);
        assert!(f.cluster.healthy().is_empty());
    }

    #[tokio::test]
    async fn second_activation_is_a_noop() {
        let connector = Arc::new(FakeConnector::default());
        let _frames = connector.open(&format!("{A}/v2/events"));
        let mut f = fixture(&[A], connector.clone());

        f.transport.activate().await.unwrap();
        f.transport.activate().await.unwrap();

        assert!(f.transport.is_started());
        assert_eq!(connector.calls().len(), 1);
    }

    #[tokio::test]
    async fn frame_errors_do_not_end_the_stream() {
        let connector = Arc::new(FakeConnector::default());
        let frames = connector.open(&format!("{A}/v2/events"));
        let mut f = fixture(&[A], connector.clone());
        let (handle, mut rx) = listener(8);
        f.registry.write().await.add(&handle, crate::filter::ALL);
        f.transport.activate().await.unwrap();

        frames.send(Err(crate::StreamError::Read("truncated".into()))).unwrap();
        frames.send(Ok(frame("{broken"))).unwrap();
        frames.send(Ok(frame(payloads::of_kind(EventKind::GroupChangeFailed)))).unwrap();

        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::GroupChangeFailed);
        assert_eq!(connector.calls().len(), 1);
    }

    #[tokio::test]
    async fn ended_stream_reconnects_in_the_background() {
        let connector = Arc::new(FakeConnector::default());
        let first = connector.open(&format!("{A}/v2/events"));
        connector.refuse(&format!("{A}/v2/events"));
        let second = connector.open(&format!("{B}/v2/events"));
        let mut f = fixture(&[A, B], connector.clone());
        let (handle, mut rx) = listener(8);
        f.registry.write().await.add(&handle, crate::filter::ALL);
        f.transport.activate().await.unwrap();

        drop(first);
        eventually("reconnect to B", || connector.calls().len() == 3).await;
        assert_eq!(f.cluster.healthy(), vec![B.to_string()]);

        second.send(Ok(frame(payloads::of_kind(EventKind::AppTerminated)))).unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::AppTerminated);
    }

    #[tokio::test]
    async fn reconnect_waits_for_a_member_to_come_back() {
        let connector = Arc::new(FakeConnector::default());
        let first = connector.open(&format!("{A}/v2/events"));
        connector.refuse(&format!("{A}/v2/events"));
        let mut f = fixture(&[A], connector.clone());
        f.transport.activate().await.unwrap();

        drop(first);
        eventually("member marked down", || f.cluster.healthy().is_empty()).await;

        let _again = connector.open(&format!("{A}/v2/events"));
        f.cluster.mark_up(A);
        eventually("reconnected", || connector.calls().len() == 3).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.calls().len(), 3);
    }

    #[tokio::test]
    async fn restarted_member_is_retried_without_being_marked_up() {
        let connector = Arc::new(FakeConnector::default());
        let first = connector.open(&format!("{A}/v2/events"));
        connector.refuse(&format!("{A}/v2/events"));
        let second = connector.open(&format!("{A}/v2/events"));
        let cluster = Arc::new(MemberList::new([A]).with_retry_after(Duration::from_millis(50)));
        let mut f = fixture_with(cluster, connector.clone());
        let (handle, mut rx) = listener(8);
        f.registry.write().await.add(&handle, crate::filter::ALL);
        f.transport.activate().await.unwrap();

        drop(first);
        eventually("reconnect after retry delay", || connector.calls().len() == 3).await;
        assert_eq!(f.cluster.healthy(), vec![A.to_string()]);

        second.send(Ok(frame(payloads::of_kind(EventKind::AppTerminated)))).unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::AppTerminated);
    }

    #[tokio::test]
    async fn reads_events_from_a_live_member() {
        let marathon = FakeMarathon::start().await;
        let connector = Arc::new(SseConnector::new(reqwest::Client::new()));
        let mut f = fixture(&[marathon.base_url().as_str()], connector);
        let (handle, mut rx) = listener(8);
        f.registry.write().await.add(&handle, EventKind::StatusUpdate.bit());

        f.transport.activate().await.unwrap();
        eventually("stream client", || marathon.stream_count() == 1).await;

        let health = payloads::of_kind(EventKind::HealthStatusChanged);
        let status = payloads::of_kind(EventKind::StatusUpdate);
        marathon.push(&format!(": hello\n\nevent: x\ndata: {health}\n\ndata: {status}\n\n"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::StatusUpdate);
        assert_eq!(event.payload().app_id(), Some("/web"));
    }
}
