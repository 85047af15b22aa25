use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

use crate::domain::recommend::{AlgorithmRequest, AlgorithmResponse};
use crate::domain::sounds::validate_ranks;
use crate::error::ApiError;

/// HTTP client for the external scoring service.
///
/// Transport contract: any status below 500 is a response to be interpreted
/// by the caller (4xx bodies are decoded, not thrown); a 5xx or a
/// connection-level failure is a hard failure. One retry on transient
/// connection failure, then the call surfaces as service-unavailable.
#[derive(Clone)]
pub struct AlgorithmClient {
    http: Client,
    base_url: String,
}

/// A decoded reply from the algorithm service, status still attached so the
/// caller decides how to interpret non-2xx bodies.
#[derive(Debug, Clone)]
pub struct AlgorithmReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl AlgorithmReply {
    /// Interpret the reply as a successful recommendation. Non-2xx replies
    /// and bodies missing the required fields are upstream errors: the
    /// service answered, it just did not answer usefully.
    pub fn into_recommendation(self) -> Result<AlgorithmResponse, ApiError> {
        if !(200..300).contains(&self.status) {
            let detail = self
                .body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("no detail");
            return Err(ApiError::Upstream(format!(
                "status {}: {detail}",
                self.status
            )));
        }
        let response: AlgorithmResponse = serde_json::from_value(self.body)
            .map_err(|e| ApiError::Upstream(format!("malformed response body: {e}")))?;
        validate_ranks(&response.recommended_sounds)
            .map_err(|e| ApiError::Upstream(format!("invalid rank list in response: {e}")))?;
        Ok(response)
    }
}

impl AlgorithmClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// POST `payload` to `{base_url}{endpoint_suffix}`.
    pub async fn call(
        &self,
        endpoint_suffix: &str,
        payload: &AlgorithmRequest,
    ) -> Result<AlgorithmReply, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint_suffix);

        let mut last_err: Option<reqwest::Error> = None;
        for attempt in 0..2 {
            match self.http.post(&url).json(payload).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status >= 500 {
                        return Err(ApiError::Upstream(format!("status {status}")));
                    }
                    // A timeout while reading the body is the same "service
                    // never answered" condition as a timeout on connect.
                    let body = match response.json::<serde_json::Value>().await {
                        Ok(body) => body,
                        Err(e) if e.is_timeout() => {
                            return Err(ApiError::UpstreamUnavailable(format!(
                                "timed out reading response body: {e}"
                            )));
                        }
                        Err(e) => {
                            return Err(ApiError::Upstream(format!(
                                "unreadable response body: {e}"
                            )));
                        }
                    };
                    return Ok(AlgorithmReply { status, body });
                }
                Err(err) if is_transient(&err) && attempt == 0 => {
                    tracing::warn!("algorithm call to {url} failed, retrying once: {err}");
                    last_err = Some(err);
                }
                Err(err) => {
                    return Err(ApiError::UpstreamUnavailable(err.to_string()));
                }
            }
        }

        Err(ApiError::UpstreamUnavailable(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "connection failed".to_string()),
        ))
    }
}

/// Connection refused, unresolvable host, timeout - worth a single retry.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
