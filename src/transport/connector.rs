//! # Stream connector collaborator.
//!
//! [`StreamConnector`] opens a server-push stream at a URL and yields its
//! frames. [`SseConnector`] is the `reqwest` implementation: a long-lived GET
//! whose body is fed through a [`FrameDecoder`].

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};

use crate::error::StreamError;

use super::frame::{Frame, FrameDecoder};

/// Frames of one open stream. `Err` items are read failures inside the stream;
/// the stream ends when the server closes it.
pub type FrameStream = BoxStream<'static, Result<Frame, StreamError>>;

/// Opens event streams.
#[async_trait]
pub trait StreamConnector: Send + Sync + 'static {
    /// Connects to `url`. An `Err` means no stream was established.
    async fn connect(&self, url: &str) -> Result<FrameStream, StreamError>;
}

/// Longest line accepted by [`SseConnector`] unless configured otherwise.
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 << 20;

/// Server-sent-events connector over `reqwest`.
pub struct SseConnector {
    client: Client,
    max_line_bytes: usize,
}

impl SseConnector {
    /// Wraps an existing client. The client must not carry an overall request
    /// timeout, or it will cut the stream.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Ends a stream with [`StreamError::Read`] once a single line grows past
    /// `max` bytes without a terminator.
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Builds a client that only bounds the connect phase.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl StreamConnector for SseConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, StreamError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
            .map_err(|source| StreamError::Connect {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Read(e.to_string())));
        Ok(frames(bytes, self.max_line_bytes).boxed())
    }
}

struct Decoding {
    bytes: BoxStream<'static, Result<Bytes, StreamError>>,
    decoder: FrameDecoder,
    max_line_bytes: usize,
    ready: VecDeque<Result<Frame, StreamError>>,
    done: bool,
}

/// Turns a byte stream into a frame stream.
///
/// A read error, or a line longer than `max_line_bytes`, is yielded after the
/// frames completed before it and ends the stream.
pub(crate) fn frames<S>(
    bytes: S,
    max_line_bytes: usize,
) -> impl Stream<Item = Result<Frame, StreamError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, StreamError>> + Send + 'static,
{
    let state = Decoding {
        bytes: bytes.boxed(),
        decoder: FrameDecoder::new(),
        max_line_bytes,
        ready: VecDeque::new(),
        done: false,
    };
    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.ready.extend(st.decoder.feed(&chunk).into_iter().map(Ok));
                    if st.decoder.pending() > st.max_line_bytes {
                        st.done = true;
                        st.ready.push_back(Err(StreamError::Read(format!(
                            "line exceeds {} bytes",
                            st.max_line_bytes
                        ))));
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.ready.push_back(Err(e));
                }
                None => return None,
            }
        }
    })
}
