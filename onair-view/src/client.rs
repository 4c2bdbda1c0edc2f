//! HTTP client for the onair-sync service
//!
//! Endpoints:
//! - `GET {server}/api/status` - cold start
//! - `GET {server}/api/events` - SSE push channel

use crate::error::{ClientError, Result};
use crate::sse_parser::SseParser;
use futures::stream::{Stream, StreamExt};
use onair_common::api::StatusView;
use onair_common::events::StationEvent;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Events decoded from one push connection; ends when the connection does
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StationEvent>> + Send>>;

#[derive(Debug, Clone)]
pub struct SyncClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SyncClient {
    /// `timeout` bounds status requests and connection setup; the push
    /// channel itself stays open indefinitely.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("onair-view/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current status once
    pub async fn status(&self) -> Result<StatusView> {
        let response = self
            .http_client
            .get(format!("{}/api/status", self.base_url))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Open the push channel
    ///
    /// The first event of a healthy connection is a `Snapshot`. Events with
    /// unknown names or undecodable payloads are skipped.
    pub async fn events(&self) -> Result<EventStream> {
        let response = self
            .http_client
            .get(format!("{}/api/events", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        debug!("Push channel connected to {}", self.base_url);

        Ok(Box::pin(decode_events(response)))
    }
}

fn decode_events(response: reqwest::Response) -> impl Stream<Item = Result<StationEvent>> + Send {
    async_stream::try_stream! {
        let mut parser = SseParser::new();
        let bytes = response.bytes_stream();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for frame in parser.push(&chunk) {
                match StationEvent::from_sse(frame.event_type(), &frame.data) {
                    Ok(Some(event)) => yield event,
                    Ok(None) => debug!("Ignoring unknown event '{}'", frame.event_type()),
                    Err(e) => warn!("Undecodable {} event: {}", frame.event_type(), e),
                }
            }
        }
    }
}
