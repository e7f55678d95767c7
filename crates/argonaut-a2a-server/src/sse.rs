//! Server-Sent Events plumbing for task event streams.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::response::sse::{Event as AxumEvent, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::error::{Result, ServerError};
use crate::types::TaskEvent;

/// An SSE event ready to be sent to a client.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
        }
    }

    pub fn with_type(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: data.into(),
        }
    }

    pub fn from_task_event(event: &TaskEvent) -> Result<Self> {
        let data = serde_json::to_string(event).map_err(ServerError::Json)?;
        Ok(Self::with_type(event.event_name(), data))
    }
}

impl From<SseEvent> for AxumEvent {
    fn from(event: SseEvent) -> Self {
        let mut axum_event = AxumEvent::default().data(event.data);
        if let Some(event_type) = event.event_type {
            axum_event = axum_event.event(event_type);
        }
        axum_event
    }
}

pin_project! {
    /// Adapts a stream of task events into SSE frames.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
    }
}

impl<S> SseStream<S> {
    pub fn new(stream: S) -> Self {
        Self { inner: stream }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = TaskEvent>,
{
    type Item = std::result::Result<AxumEvent, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(event)) => match SseEvent::from_task_event(&event) {
                Ok(sse_event) => Poll::Ready(Some(Ok(sse_event.into()))),
                Err(e) => {
                    log::error!("Failed to convert task event to SSE: {}", e);
                    let error_event = SseEvent::with_type(
                        "error",
                        format!(r#"{{"error": "Failed to serialize event: {}"}}"#, e),
                    );
                    Poll::Ready(Some(Ok(error_event.into())))
                }
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Builds an SSE response with keep-alive comments.
pub fn create_sse_response<S>(stream: S, keepalive_interval: Duration) -> Response
where
    S: Stream<Item = TaskEvent> + Send + 'static,
{
    Sse::new(SseStream::new(stream))
        .keep_alive(
            KeepAlive::new()
                .interval(keepalive_interval)
                .text("keep-alive"),
        )
        .into_response()
}
