//! SSE stream transport.
//!
//! Opens a long-lived HTTP connection and yields the event-stream frames it
//! carries, in order, until normal termination (the `[DONE]` sentinel or
//! end of stream) or a connection-level failure. After either terminal
//! outcome no further item is ever yielded. Dropping the stream closes the
//! connection, so the consumer releases the resource on every exit path by
//! construction.

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use reqwest::{Client, Method, StatusCode};
use std::pin::Pin;

use crate::error::truncate_body;

/// Literal frame payload signaling normal termination with no further data.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed event-stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name when the frame carried one other than the default.
    pub event: Option<String>,
    pub data: String,
}

/// An item yielded by an open event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Frame(SseFrame),
    /// The `[DONE]` sentinel; the stream is finished.
    Done,
}

/// Failure to open the stream.
///
/// Status mapping is vendor policy, so the raw status and body are handed
/// back to the adapter instead of being mapped here.
#[derive(Debug)]
pub enum OpenError {
    Status { code: StatusCode, body: String },
    Connect(String),
}

#[derive(Debug, Clone)]
pub struct EventStreamRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

type InnerStream = Pin<
    Box<
        dyn Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send,
    >,
>;

/// An open event stream: `opened -> receiving* -> closed`.
pub struct EventStream {
    inner: InnerStream,
    terminated: bool,
}

impl EventStream {
    fn new(bytes: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        EventStream {
            inner: Box::pin(bytes.eventsource()),
            terminated: false,
        }
    }

    /// Next item, or `None` once the stream has closed.
    ///
    /// A connection-level error is yielded once and closes the stream; the
    /// sentinel closes it after being yielded. No item follows either.
    pub async fn next_item(&mut self) -> Option<Result<StreamItem, String>> {
        if self.terminated {
            return None;
        }
        match self.inner.next().await {
            None => {
                self.terminated = true;
                debug!("Event stream closed by server");
                None
            }
            Some(Ok(event)) => {
                if event.data == DONE_SENTINEL {
                    info!("Received [DONE] signal, closing stream.");
                    self.terminated = true;
                    Some(Ok(StreamItem::Done))
                } else {
                    let name = if event.event.is_empty() || event.event == "message" {
                        None
                    } else {
                        Some(event.event)
                    };
                    Some(Ok(StreamItem::Frame(SseFrame {
                        event: name,
                        data: event.data,
                    })))
                }
            }
            Some(Err(err)) => {
                self.terminated = true;
                Some(Err(err.to_string()))
            }
        }
    }
}

/// Opens event streams over a plain (non-retrying) HTTP client.
#[derive(Clone)]
pub struct StreamTransport {
    client: Client,
}

impl StreamTransport {
    pub fn new(client: Client) -> Self {
        StreamTransport { client }
    }

    pub async fn open(&self, request: EventStreamRequest) -> Result<EventStream, OpenError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| OpenError::Connect(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenError::Status {
                code: status,
                body: truncate_body(&body),
            });
        }

        debug!("Event stream opened: {}", request.url);
        Ok(EventStream::new(response.bytes_stream()))
    }
}
