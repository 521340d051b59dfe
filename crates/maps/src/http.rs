//! Shared request plumbing: client construction, sending, body decoding.

use crate::{Error, Result, ServerParams};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Build the HTTP client for one server.
///
/// Idle connections are not kept: each call stands on its own.
pub(crate) fn client(params: &ServerParams) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(params.user_agent.clone())
        .timeout(params.timeout)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| Error::upstream(None, format!("failed to build HTTP client: {e}")))
}

/// Send a request and return the raw response, whatever its status.
pub(crate) async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response> {
    let started = Instant::now();
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    debug!(
        url = %response.url(),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "provider responded"
    );
    Ok(response)
}

/// Read the whole body as text.
pub(crate) async fn text(response: Response, timeout: Duration) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    Ok((status, body))
}

/// Decode a success body, turning any non-2xx status into `Upstream`.
pub(crate) async fn json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
    context: &str,
) -> Result<T> {
    let (status, body) = text(response, timeout).await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    decode(&body, context)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::malformed(context, e))
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    warn!(status = status.as_u16(), "provider returned an error status");
    Error::upstream(Some(status.as_u16()), truncate(body.trim(), 500))
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        warn!(timeout_ms = timeout.as_millis() as u64, "provider request timed out");
        Error::Timeout(timeout)
    } else {
        warn!(error = %err, "provider request failed");
        Error::upstream(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
