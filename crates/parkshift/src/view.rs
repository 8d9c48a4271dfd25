//! Client-visible session state, published through a `watch` channel.

use serde::Serialize;
use thiserror::Error;

use crate::client::ServiceError;
use crate::types::{ComputationResult, ParameterSet, RequestToken};
use crate::validate::ValidationError;

/// An error surfaced to the user. Every one is recoverable by editing.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "source", content = "error", rename_all = "snake_case")]
pub enum SessionError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Service(ServiceError),
}

/// Counters for monitoring a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub dispatched: u64,
    pub applied: u64,
    pub superseded: u64,
    pub service_failures: u64,
    pub validation_failures: u64,
    pub rejected_intents: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub params: ParameterSet,
    /// Last result applied for the latest token.
    pub result: Option<ComputationResult>,
    /// True while the latest dispatched request is outstanding.
    pub loading: bool,
    pub error: Option<SessionError>,
    pub applied_token: Option<RequestToken>,
    pub stats: SessionStats,
}

impl ViewState {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            result: None,
            loading: false,
            error: None,
            applied_token: None,
            stats: SessionStats::default(),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}
