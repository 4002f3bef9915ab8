//! HTTP Transport
//!
//! The client only needs a form POST with a deadline. [`HttpTransport`] does
//! it over reqwest; [`MockTransport`] replays canned responses for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::{CheckoutError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Raw HTTP response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TransportResponse {
    /// A 200 response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: body.into(),
        }
    }
}

/// Transport trait
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a form-encoded body, failing if no response arrives within `timeout`
    async fn post(&self, url: &str, body: &str, timeout: Duration) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing reqwest client (proxies, TLS settings, ...)
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &str, timeout: Duration) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.to_owned())
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(transport_error)?;

        Ok(TransportResponse { status, headers, body })
    }
}

fn transport_error(e: reqwest::Error) -> CheckoutError {
    if e.is_timeout() {
        CheckoutError::Transport(format!("deadline exceeded: {e}"))
    } else {
        CheckoutError::Transport(e.to_string())
    }
}

/// A request seen by [`MockTransport`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub body: String,
    pub timeout: Duration,
}

/// Mock transport with queued responses
///
/// Each `post` pops the next queued outcome; an empty queue is a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with an NVP body
    pub fn respond_with(self, body: impl Into<String>) -> Self {
        self.push(Ok(TransportResponse::ok(body)));
        self
    }

    /// Queue a transport failure
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.push(Err(CheckoutError::Transport(message.into())));
        self
    }

    /// Queue an arbitrary outcome
    pub fn push(&self, outcome: Result<TransportResponse>) {
        lock(&self.responses).push_back(outcome);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, url: &str, body: &str, timeout: Duration) -> Result<TransportResponse> {
        lock(&self.requests).push(RecordedRequest {
            url: url.to_owned(),
            body: body.to_owned(),
            timeout,
        });

        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(CheckoutError::Transport("no response queued".into())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
