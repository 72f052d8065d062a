//! Blocking HTTP execution with verb/payload checks and bounded retries.
//!
//! # Design
//! `Transport` is the single I/O seam: one request in, one response out, no
//! retries and no status interpretation. `RestClient` sits on top of it and
//! owns everything that must happen around the wire call: rejecting illegal
//! verb/payload pairs before any attempt, encoding the body, standard
//! headers, and re-sending on network failure. Non-2xx responses are data,
//! not errors.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{DispatchError, Result};
use crate::http::{ApiResponse, HttpMethod, HttpRequest, HttpResponse, PayloadType};
use crate::payload::encode_body;

pub const USER_AGENT: &str = concat!("dispatch-core/", env!("CARGO_PKG_VERSION"));

/// A network-level failure of a single attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SendError(pub String);

pub type SendResult = std::result::Result<HttpResponse, SendError>;

/// Executes one HTTP round trip.
pub trait Transport: Send + Sync {
    /// Send `request`. A zero `timeout` means no deadline.
    fn send(&self, request: &HttpRequest, timeout: Duration) -> SendResult;
}

/// `Transport` backed by a blocking `ureq` agent.
///
/// One agent is held for the lifetime of the transport so connections are
/// pooled across calls. The deadline is applied per request.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn prepare<B>(
    builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Duration,
) -> ureq::RequestBuilder<B> {
    let deadline = (!timeout.is_zero()).then_some(timeout);
    let mut builder = builder.config().timeout_global(deadline).build();
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> SendResult {
        let agent = &self.agent;
        let url = request.url.as_str();
        let headers = &request.headers;

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(agent.get(url), headers, timeout).call(),
            (HttpMethod::Delete, _) => prepare(agent.delete(url), headers, timeout).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(agent.post(url), headers, timeout).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => prepare(agent.post(url), headers, timeout).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                prepare(agent.put(url), headers, timeout).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => prepare(agent.put(url), headers, timeout).send_empty(),
        };
        let mut response = result.map_err(|e| SendError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| SendError(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Verb-aware request executor with retries.
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("transport", &"<dyn Transport>")
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new(Arc::new(UreqTransport::new()))
    }
}

impl RestClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry_delay: Duration::ZERO,
        }
    }

    /// Pause between a failed attempt and the next one.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Execute one call, retrying network failures up to `retries` more times.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_request(
        &self,
        verb: HttpMethod,
        url: &str,
        payload_type: PayloadType,
        payload: Option<&Map<String, Value>>,
        headers: &[(String, String)],
        timeout: Duration,
        retries: u32,
    ) -> Result<ApiResponse> {
        let request = build_request(verb, url, payload_type, payload, headers)?;
        let max_attempts = retries.saturating_add(1);
        let mut last_error = SendError(String::new());

        for attempt in 1..=max_attempts {
            match self.transport.send(&request, timeout) {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "request succeeded after retry");
                    }
                    return Ok(ApiResponse::from(response));
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        verb = %verb,
                        error = %error,
                        "request attempt failed"
                    );
                    last_error = error;
                    if attempt < max_attempts && !self.retry_delay.is_zero() {
                        std::thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(DispatchError::Transport {
            attempts: max_attempts,
            message: last_error.0,
        })
    }
}

/// Check verb/payload legality and assemble the wire request.
pub fn build_request(
    verb: HttpMethod,
    url: &str,
    payload_type: PayloadType,
    payload: Option<&Map<String, Value>>,
    headers: &[(String, String)],
) -> Result<HttpRequest> {
    let body = match (verb.requires_payload(), payload) {
        (false, Some(_)) => {
            return Err(DispatchError::protocol("Payload not supported for this method."));
        }
        (true, Some(p)) if !p.is_empty() => Some(encode_body(payload_type, p)?),
        (true, _) => {
            return Err(DispatchError::protocol("Must include payload for this method."));
        }
        (false, None) => None,
    };

    let mut all_headers = vec![
        ("accept".to_string(), "application/json".to_string()),
        ("user-agent".to_string(), USER_AGENT.to_string()),
    ];
    if body.is_some() {
        all_headers.push(("content-type".to_string(), payload_type.content_type().to_string()));
    }
    all_headers.extend(headers.iter().cloned());

    Ok(HttpRequest {
        method: verb,
        url: url.to_string(),
        headers: all_headers,
        body,
    })
}
