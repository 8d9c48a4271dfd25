//! Outbound calls to the Computation Service.
//!
//! One call per dispatched token. No retries: a failed call is reported and
//! the user's next edit produces the next request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::types::ComputationResult;
use crate::validate::ValidatedPayload;

/// Used when a failure response carries no `{ "error": ... }` body.
pub const GENERIC_TRANSPORT_ERROR: &str = "Calculation service request failed";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ServiceError {
    /// The request never produced a response (connect, timeout, reset).
    #[error("Could not reach calculation service: {0}")]
    Transport(String),

    /// Non-success status. `message` is the service's own error text when it
    /// sent one.
    #[error("Calculation service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Success status but the body is not a usable result.
    #[error("Calculation service sent a malformed response: {0}")]
    Malformed(String),
}

/// Anything that can turn a validated payload into a result.
#[async_trait]
pub trait ComputeService: Send + Sync {
    async fn compute(&self, payload: ValidatedPayload) -> Result<ComputationResult, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// reqwest-backed client for the calculate endpoint.
#[derive(Debug, Clone)]
pub struct HttpComputeClient {
    client: Client,
    url: String,
}

impl HttpComputeClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ComputeService for HttpComputeClient {
    #[tracing::instrument(
        skip(self, payload),
        fields(
            service.url = %self.url,
            changed_mode = ?payload.changed_mode_key,
        )
    )]
    async fn compute(&self, payload: ValidatedPayload) -> Result<ComputationResult, ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_TRANSPORT_ERROR.to_string());
            tracing::warn!(status = status.as_u16(), %message, "calculation failed");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        serde_json::from_slice::<ComputationResult>(&body)
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}
