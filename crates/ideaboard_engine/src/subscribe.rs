use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio::sync::mpsc;
use tracker_logging::{tracker_debug, tracker_trace};

use crate::sse::SseDecoder;
use crate::types::map_reqwest_error;
use crate::{FailureKind, TransportError};

#[derive(Debug, Clone)]
pub struct SubscribeSettings {
    pub connect_timeout: Duration,
}

impl Default for SubscribeSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Receives the `data` of every event, in arrival order.
pub trait EventSink: Send + Sync {
    fn emit(&self, data: String);
}

pub struct ChannelEventSink<T> {
    tx: mpsc::UnboundedSender<T>,
    wrap: fn(String) -> T,
}

impl<T: Send> ChannelEventSink<T> {
    pub fn new(tx: mpsc::UnboundedSender<T>, wrap: fn(String) -> T) -> Self {
        Self { tx, wrap }
    }
}

impl<T: Send> EventSink for ChannelEventSink<T> {
    fn emit(&self, data: String) {
        let _ = self.tx.send((self.wrap)(data));
    }
}

#[async_trait::async_trait]
pub trait StreamSubscriber: Send + Sync {
    /// Runs the subscription until it ends. Every ending, including a clean
    /// close by the server, is reported as the returned error.
    async fn subscribe(&self, url: &str, sink: &dyn EventSink) -> TransportError;
}

#[derive(Debug, Clone)]
pub struct ReqwestSubscriber {
    settings: SubscribeSettings,
}

impl ReqwestSubscriber {
    pub fn new(settings: SubscribeSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        // No overall timeout: the stream stays open for as long as the run lasts.
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }

    async fn run(&self, url: &str, sink: &dyn EventSink) -> Result<(), TransportError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let response = client
            .get(parsed)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                if body.is_empty() { status.to_string() } else { body },
            ));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/event-stream"));

        // The proxy answers with plain JSON when the upstream does not stream.
        if !is_event_stream {
            let body = response.text().await.map_err(map_reqwest_error)?;
            tracker_debug!("Non-streaming answer from {} ({} bytes)", url, body.len());
            if !body.trim().is_empty() {
                sink.emit(body);
            }
            return Ok(());
        }

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            for event in decoder.push(&chunk) {
                tracker_trace!("SSE event {:?} ({} bytes)", event.event, event.data.len());
                sink.emit(event.data);
            }
        }
        Ok(())
    }
}

impl Default for ReqwestSubscriber {
    fn default() -> Self {
        Self::new(SubscribeSettings::default())
    }
}

#[async_trait::async_trait]
impl StreamSubscriber for ReqwestSubscriber {
    async fn subscribe(&self, url: &str, sink: &dyn EventSink) -> TransportError {
        match self.run(url, sink).await {
            Ok(()) => TransportError::new(FailureKind::StreamEnded, "server closed the stream"),
            Err(err) => err,
        }
    }
}
