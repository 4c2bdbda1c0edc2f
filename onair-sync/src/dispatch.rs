//! Push-notification dispatch
//!
//! The only contract with the external push service is "send message M to
//! token set T". Delivery is best effort; failures are logged and dropped.

use async_trait::async_trait;
use onair_common::config::NotificationConfig;
use onair_common::events::TransitionEvent;
use onair_common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TITLE: &str = "On air now";

/// Message sent to the push service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Free-form payload for the receiving app
    pub data: serde_json::Value,
}

impl PushMessage {
    /// Build the notification for a transition, if it warrants one
    pub fn for_transition(event: &TransitionEvent, title: Option<&str>) -> Option<Self> {
        let TransitionEvent::WentLive {
            collaborator, new, ..
        } = event
        else {
            return None;
        };

        let body = match collaborator {
            Some(name) => format!("{} is live now", name),
            None => "We're live now".to_string(),
        };

        Some(Self {
            title: title.unwrap_or(DEFAULT_TITLE).to_string(),
            body,
            data: serde_json::json!({
                "event": "WentLive",
                "station_id": new.station_id,
                "collaborator": collaborator,
            }),
        })
    }
}

/// External push-notification collaborator
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn send(&self, message: &PushMessage, tokens: &[String]) -> Result<()>;
}

/// Dispatcher used when notifications are disabled: logs and drops
#[derive(Debug, Default, Clone)]
pub struct LogDispatcher;

#[async_trait]
impl PushDispatcher for LogDispatcher {
    async fn send(&self, message: &PushMessage, tokens: &[String]) -> Result<()> {
        info!(
            tokens = tokens.len(),
            "Notifications disabled, not sending: {}",
            message.body
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    tokens: &'a [String],
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
}

/// JSON-over-HTTP push service client
#[derive(Debug, Clone)]
pub struct HttpPushDispatcher {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushDispatcher {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    /// Build the dispatcher the config asks for
    pub fn from_config(
        config: &NotificationConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn PushDispatcher>> {
        match (&config.enabled, &config.endpoint) {
            (true, Some(endpoint)) => {
                info!("Push notifications enabled via {}", endpoint);
                Ok(Arc::new(Self::new(endpoint, config.api_key.clone(), timeout)?))
            }
            (true, None) => Err(Error::Config(
                "notifications.enabled requires notifications.endpoint".to_string(),
            )),
            (false, _) => Ok(Arc::new(LogDispatcher)),
        }
    }
}

#[async_trait]
impl PushDispatcher for HttpPushDispatcher {
    async fn send(&self, message: &PushMessage, tokens: &[String]) -> Result<()> {
        if tokens.is_empty() {
            debug!("No registered devices, skipping push");
            return Ok(());
        }

        let mut request = self.http_client.post(&self.endpoint).json(&PushRequest {
            tokens,
            title: &message.title,
            body: &message.body,
            data: &message.data,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("push service: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "push service returned HTTP {}",
                status.as_u16()
            )));
        }

        info!(tokens = tokens.len(), "Push notification sent");
        Ok(())
    }
}
