//! HTTP + SSE client for the agent's streaming query endpoint.

use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::{Context as _, Result};
use eventsource_stream::{EventStream, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{StreamError, StreamErrorKind};
use super::frame::{Frame, Terminal, parse_frame};
use super::request::ChatRequest;
use crate::config::ServerConfig;

/// User-Agent sent with every request.
pub const GENIE_USER_AGENT: &str = concat!("genie/", env!("CARGO_PKG_VERSION"));

/// How a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Finished,
    QuotaExhausted,
    Cancelled,
}

impl From<Terminal> for StreamEnd {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Finished => StreamEnd::Finished,
            Terminal::QuotaExhausted => StreamEnd::QuotaExhausted,
        }
    }
}

/// Callback-style delivery for one request: `Frame` per unit, then exactly
/// one of `Error` or `Closed`. Nothing is delivered after cancellation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Frame(Frame),
    Error(StreamError),
    Closed,
}

/// A [`StreamEvent`] tagged with the request it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub request_id: String,
    pub event: StreamEvent,
}

/// SSE parser that turns a byte stream into frames.
pub struct FrameStream<S> {
    inner: EventStream<S>,
}

impl<S> FrameStream<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<Frame, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(Ok(parse_frame(&event.data)))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(StreamError::new(
                StreamErrorKind::Transport,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl StreamClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header '{name}'"))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs one request to completion, handing every frame to `on_frame` in
    /// delivery order.
    ///
    /// Returns once a terminal frame has been delivered; anything the server
    /// sends after it is never read. A body that ends first is
    /// [`StreamErrorKind::ClosedEarly`]. Cancelling `cancel` stops delivery
    /// immediately and returns [`StreamEnd::Cancelled`].
    pub async fn stream<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        mut on_frame: F,
    ) -> Result<StreamEnd, StreamError>
    where
        F: FnMut(Frame),
    {
        tracing::debug!(
            request_id = %request.request_id,
            session_id = %request.session_id,
            endpoint = %self.endpoint,
            "Opening stream"
        );

        let send = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .header(USER_AGENT, GENIE_USER_AGENT)
            .headers(self.headers.clone())
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            response = send => response.map_err(|e| StreamError::from_reqwest(&e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::http_status(status.as_u16(), &body));
        }

        let mut frames = FrameStream::new(response.bytes_stream());
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = frames.next() => next,
            };

            let Some(frame) = next else {
                return Err(StreamError::closed_early());
            };
            let frame = frame?;
            tracing::trace!(request_id = %request.request_id, kind = frame.kind(), "Frame");

            let terminal = frame.terminal();
            on_frame(frame);
            if let Some(terminal) = terminal {
                tracing::debug!(request_id = %request.request_id, ?terminal, "Stream finished");
                return Ok(terminal.into());
            }
        }
    }

    /// Spawns [`stream`](Self::stream) for `request`, forwarding everything
    /// to `sink` tagged with the request id.
    ///
    /// Each call opens its own stream; earlier subscriptions keep running.
    pub fn open(
        &self,
        request: ChatRequest,
        sink: mpsc::UnboundedSender<StreamMessage>,
    ) -> Subscription {
        let cancel = CancellationToken::new();
        let request_id = request.request_id.clone();
        let client = self.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let id = request.request_id.clone();
            let send = |event: StreamEvent| {
                if token.is_cancelled() {
                    return;
                }
                let message = StreamMessage {
                    request_id: id.clone(),
                    event,
                };
                if sink.send(message).is_err() {
                    tracing::trace!(request_id = %id, "Stream receiver dropped");
                }
            };

            let result = client
                .stream(&request, &token, |frame| send(StreamEvent::Frame(frame)))
                .await;

            match result {
                Ok(StreamEnd::Cancelled) => {
                    tracing::debug!(request_id = %id, "Stream cancelled");
                }
                Ok(_) => send(StreamEvent::Closed),
                Err(err) => {
                    tracing::warn!(request_id = %id, kind = %err.kind, error = %err, "Stream failed");
                    send(StreamEvent::Error(err));
                }
            }
        });

        Subscription {
            request_id,
            cancel,
            handle,
        }
    }
}

/// Handle to a stream started with [`StreamClient::open`].
#[derive(Debug)]
pub struct Subscription {
    request_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Stops delivery. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the stream task to exit.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            tracing::warn!(request_id = %self.request_id, error = %err, "Stream task failed");
        }
    }
}
