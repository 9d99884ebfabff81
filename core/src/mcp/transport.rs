//! HTTP transport with exponential-backoff retry (§4.8, §6.4). Grounded in
//! the teacher's `McpHttpSession` (reqwest POST, `MCP-Session-Id` header
//! capture, SSE-or-JSON body parsing) but extended with the retry policy the
//! teacher's session never implemented — it sent exactly one POST per call.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use super::protocol::{is_retryable_error_code, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::McpError;
use crate::tool::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetryStrategy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryStrategy {
    /// `base * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
    session_id: Mutex<Option<String>>,
    retry: RetryStrategy,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, headers: Vec<(String, String)>, timeout: Duration, retry: RetryStrategy) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers,
            session_id: Mutex::new(None),
            retry,
            timeout,
        }
    }

    /// A fresh UUID per request (§4.8 step 1, §6.1) rather than a sequential counter.
    fn next_request_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Sends `method`/`params` as a JSON-RPC request, retrying on transient
    /// failure per the exponential-backoff policy. Never retries the
    /// malformed-request error-code family, and checks cancellation before
    /// every sleep.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        cancellation: &CancellationToken,
    ) -> Result<Value, McpError> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id, method, params);

        let mut attempt = 0u32;
        loop {
            if cancellation.is_cancelled() {
                return Err(McpError::Cancelled);
            }

            match self.send_once(&request).await {
                Ok(response) => {
                    tracing::debug!(method, attempt, "mcp request completed");
                    return self.into_result(response);
                }
                Err(TransportFailure::RpcError(error)) if !is_retryable_error_code(error.code) => {
                    tracing::warn!(method, code = error.code, "mcp request failed, not retrying");
                    return Err(McpError::Protocol {
                        code: error.code,
                        message: error.message,
                    });
                }
                Err(failure) => {
                    if attempt >= self.retry.max_retries {
                        tracing::warn!(method, attempt, "mcp request exhausted retries");
                        return Err(failure.into_mcp_error());
                    }
                    let delay = failure
                        .retry_after()
                        .unwrap_or_else(|| self.retry.delay_for_attempt(attempt));
                    if cancellation.is_cancelled() {
                        return Err(McpError::Cancelled);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn into_result(&self, response: JsonRpcResponse) -> Result<Value, McpError> {
        if let Some(error) = response.error {
            return Err(McpError::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(McpError::EmptyResult)
    }

    async fn send_once(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportFailure> {
        let mut builder = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", super::protocol::PROTOCOL_VERSION)
            .json(request);

        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(session_id) = self.session_id.lock().unwrap().clone() {
            builder = builder.header("MCP-Session-Id", session_id);
        }

        let response = builder.send().await.map_err(TransportFailure::Http)?;

        if let Some(session_id) = response.headers().get("MCP-Session-Id").and_then(|v| v.to_str().ok()) {
            *self.session_id.lock().unwrap() = Some(session_id.to_string());
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Err(TransportFailure::Accepted);
        }
        if !status.is_success() {
            return Err(TransportFailure::Status { status, retry_after });
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await.map_err(TransportFailure::Http)?;

        parse_body(&content_type, &body).map_err(|message| TransportFailure::Parse(message))
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let mut builder = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(&JsonRpcNotification::new(method, params));
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(session_id) = self.session_id.lock().unwrap().clone() {
            builder = builder.header("MCP-Session-Id", session_id);
        }
        builder.send().await.map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(())
    }
}

enum TransportFailure {
    Http(reqwest::Error),
    Status { status: StatusCode, retry_after: Option<Duration> },
    Parse(String),
    RpcError(JsonRpcError),
    Accepted,
}

impl TransportFailure {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportFailure::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    fn into_mcp_error(self) -> McpError {
        match self {
            TransportFailure::Http(e) => McpError::Transport(e.to_string()),
            TransportFailure::Status { status, .. } => McpError::Transport(format!("http status {status}")),
            TransportFailure::Parse(m) => McpError::Transport(m),
            TransportFailure::RpcError(e) => McpError::Protocol {
                code: e.code,
                message: e.message,
            },
            TransportFailure::Accepted => McpError::Transport("server returned 202 Accepted with no body".into()),
        }
    }
}

/// Parses either a plain JSON body or an SSE body (`data: ` lines), returning
/// the first line that looks like a JSON-RPC response.
fn parse_body(content_type: &str, body: &str) -> Result<JsonRpcResponse, String> {
    if content_type.contains("text/event-stream") {
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(data.trim()) {
                    return Ok(response);
                }
            }
        }
        Err("no JSON-RPC response found in SSE body".to_string())
    } else {
        serde_json::from_str(body).map_err(|e| e.to_string())
    }
}
