//! Booking backend HTTP client (POST /chat, GET /health).
//!
//! Transport failures never surface to the conversation as errors: `send_chat`
//! converts every failure into a `ChatReply` the log can append, so the history
//! stays complete. Cold starts become the synthetic startup reply.

use crate::backend::startup;
use crate::config::{resolve_backend_url, resolve_session_id, Config};
use crate::conversation::ist_now;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport-level failure from the booking backend. Internal to the client;
/// `send_chat` converts every case into a reply record.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{status} - {body}")]
    Api { status: reqwest::StatusCode, body: String },
}

/// Outgoing chat turn. Timestamps are ISO-8601 in IST regardless of host
/// locale so the backend's time-window reasoning stays consistent.
#[derive(Debug, Serialize)]
struct ChatRequest {
    role: String,
    content: String,
    timestamp: String,
}

/// Structured booking record echoed from the backend. A non-empty `id` is the
/// only signal that an event was actually created; free-text claims without
/// one are treated as a mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

impl BookingData {
    /// True when the backend actually created a calendar event.
    pub fn is_real(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Normalized reply for one chat turn. Error paths produce a reply too, with
/// no booking data, no suggestions, and no confirmation requirement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub booking_data: Option<BookingData>,
    #[serde(default)]
    pub suggested_times: Vec<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Set only by the startup classifier, never from the wire.
    #[serde(skip)]
    pub is_startup_error: bool,
}

impl ChatReply {
    /// Error reply: text only.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// GET /health payload, used only for user-facing diagnostics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub calendar_status: Option<String>,
    #[serde(default)]
    pub server_time: Option<String>,
}

/// Result of the health probe. Never alters conversation state.
#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy(HealthReport),
    Unhealthy { error: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy(_))
    }
}

/// Seam between the turn processor and the transport, so turns can run
/// against a scripted backend in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user message; always returns a reply record (errors included).
    async fn send_chat(&self, message: &str) -> ChatReply;

    /// Probe the backend health endpoint.
    async fn health(&self) -> HealthStatus;
}

/// Client for the booking backend HTTP API.
#[derive(Clone)]
pub struct BookingClient {
    base_url: String,
    session_id: String,
    chat_timeout: Duration,
    health_timeout: Duration,
    client: reqwest::Client,
}

impl BookingClient {
    pub fn new(base_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::with_timeouts(
            base_url,
            session_id,
            Duration::from_secs(35),
            Duration::from_secs(10),
        )
    }

    /// Client with explicit timeouts (tests use short ones).
    pub fn with_timeouts(
        base_url: impl Into<String>,
        session_id: impl Into<String>,
        chat_timeout: Duration,
        health_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            session_id: session_id.into(),
            chat_timeout,
            health_timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Client from resolved config (base URL, session id, timeouts).
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeouts(
            resolve_backend_url(config),
            resolve_session_id(config),
            Duration::from_secs(config.backend.request_timeout_secs),
            Duration::from_secs(config.backend.health_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// POST /chat — one user turn, typed errors. Most callers want the
    /// infallible `send_chat` from the `ChatBackend` impl instead.
    pub async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatRequest {
            role: "user".to_string(),
            content: message.to_string(),
            timestamp: ist_now().to_rfc3339(),
        };
        let res = self
            .client
            .post(&url)
            .query(&[("session_id", self.session_id.as_str())])
            .json(&body)
            .timeout(self.chat_timeout)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Api { status, body });
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl ChatBackend for BookingClient {
    async fn send_chat(&self, message: &str) -> ChatReply {
        match self.chat(message).await {
            Ok(reply) => reply,
            Err(BackendError::Api { status, body }) => {
                log::warn!("chat request failed: {} {}", status, body);
                ChatReply::error(format!("Error: {} - {}", status, body))
            }
            Err(BackendError::Request(e)) => {
                if startup::is_cold_start(&e) {
                    log::warn!("chat request matched cold-start signature: {}", e);
                    return startup::startup_reply();
                }
                log::warn!("chat request failed: {}", e);
                if e.is_connect() {
                    ChatReply::error(format!(
                        "Connection error: {}. Please check if the backend is running.",
                        e
                    ))
                } else {
                    ChatReply::error(format!("Request error: {}", e))
                }
            }
        }
    }

    async fn health(&self) -> HealthStatus {
        let url = format!("{}/health", self.base_url);
        let res = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await;
        match res {
            Ok(res) if res.status().is_success() => match res.json::<HealthReport>().await {
                Ok(report) => HealthStatus::Healthy(report),
                Err(e) => HealthStatus::Unhealthy {
                    error: e.to_string(),
                },
            },
            Ok(res) => HealthStatus::Unhealthy {
                error: format!("Status: {}", res.status()),
            },
            Err(e) => HealthStatus::Unhealthy {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_parses_wire_body() {
        let reply: ChatReply = serde_json::from_str(
            r#"{
                "message": "Here are some options",
                "booking_data": null,
                "suggested_times": ["10:00 AM", "2:00 PM"],
                "requires_confirmation": false
            }"#,
        )
        .expect("parse reply");
        assert_eq!(reply.message, "Here are some options");
        assert!(reply.booking_data.is_none());
        assert_eq!(reply.suggested_times, vec!["10:00 AM", "2:00 PM"]);
        assert!(!reply.requires_confirmation);
        assert!(!reply.is_startup_error);
    }

    #[test]
    fn chat_reply_tolerates_missing_fields() {
        let reply: ChatReply = serde_json::from_str(r#"{"message": "hi"}"#).expect("parse reply");
        assert_eq!(reply.message, "hi");
        assert!(reply.suggested_times.is_empty());
    }

    #[test]
    fn booking_data_real_requires_id() {
        let booking: BookingData =
            serde_json::from_str(r#"{"id": "", "title": "Sync"}"#).expect("parse booking");
        assert!(!booking.is_real());
        let booking: BookingData =
            serde_json::from_str(r#"{"id": "evt123", "title": "Sync"}"#).expect("parse booking");
        assert!(booking.is_real());
    }

    #[test]
    fn error_reply_carries_no_signals() {
        let reply = ChatReply::error("Error: 500 - boom");
        assert!(reply.booking_data.is_none());
        assert!(reply.suggested_times.is_empty());
        assert!(!reply.requires_confirmation);
        assert!(!reply.is_startup_error);
    }
}
