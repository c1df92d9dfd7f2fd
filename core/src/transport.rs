//! Execution of `HttpRequest` values against the network.
//!
//! `UreqTransport` is what applications use. `MockTransport` replays scripted
//! responses and records every request so the query layer can be tested
//! without a server.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations return non-2xx responses as data; only failures to obtain
/// a response at all are errors.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send;
}

/// Production transport backed by a blocking ureq agent.
///
/// Each call runs on tokio's blocking pool. `ceiling` is the agent's global
/// timeout: callers bound each call with their own, shorter or equal,
/// timeout, and the ceiling makes an abandoned call end on its own. It must
/// cover the longest caller timeout sharing the transport.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    ceiling: Duration,
}

impl UreqTransport {
    pub fn new(ceiling: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(ceiling))
            .build()
            .new_agent();
        Self { agent, ceiling }
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || call(&agent, request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn call(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let result = match method {
        HttpMethod::Get => with_headers(agent.get(&url), &headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&url), &headers).call(),
        HttpMethod::Post => send(with_headers(agent.post(&url), &headers), body),
        HttpMethod::Put => send(with_headers(agent.put(&url), &headers), body),
    };
    let mut response = result.map_err(transport_error)?;

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
        .map_err(transport_error)?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn transport_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::TimedOut,
        other => ApiError::Transport(other.to_string()),
    }
}

/// Scripted transport for tests.
///
/// Replies are taken in order as requests arrive; once the script runs out
/// every call fails with `ApiError::Transport`. Each reply is held back by
/// its own delay, or the transport-wide one, using tokio time so
/// paused-clock tests can drive timeouts and races.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Duration,
}

struct Scripted {
    delay: Option<Duration>,
    reply: Result<HttpResponse, ApiError>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.push(None, Ok(HttpResponse::new(status, body)));
    }

    /// Like `push_response`, answered `delay` after the request arrives.
    pub fn push_response_after(&self, delay: Duration, status: u16, body: impl Into<String>) {
        self.push(Some(delay), Ok(HttpResponse::new(status, body)));
    }

    pub fn push_error(&self, error: ApiError) {
        self.push(None, Err(error));
    }

    fn push(&self, delay: Option<Duration>, reply: Result<HttpResponse, ApiError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted { delay, reply });
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let scripted = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let Some(Scripted { delay, reply }) = scripted else {
            return Err(ApiError::Transport("no scripted response".to_string()));
        };
        let delay = delay.unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}
