//! Shared fixtures for session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parkconf::ParkConfig;
use parkshift::{
    ComputationResult, ComputeService, CoordinatorOptions, ServiceError, ValidatedPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A service call held open until the test answers it.
pub struct PendingCall {
    pub payload: ValidatedPayload,
    reply: oneshot::Sender<Result<ComputationResult, ServiceError>>,
}

impl PendingCall {
    pub fn respond(self, outcome: Result<ComputationResult, ServiceError>) {
        // The session may have been shut down already.
        let _ = self.reply.send(outcome);
    }
}

/// In-process service whose responses the test releases in any order.
pub struct GatedService {
    calls: mpsc::UnboundedSender<PendingCall>,
}

#[async_trait]
impl ComputeService for GatedService {
    async fn compute(&self, payload: ValidatedPayload) -> Result<ComputationResult, ServiceError> {
        let (reply, rx) = oneshot::channel();
        if self.calls.send(PendingCall { payload, reply }).is_err() {
            return Err(ServiceError::Transport("test harness gone".to_string()));
        }
        rx.await
            .unwrap_or_else(|_| Err(ServiceError::Transport("call abandoned".to_string())))
    }
}

pub fn gated() -> (Arc<GatedService>, mpsc::UnboundedReceiver<PendingCall>) {
    let (calls, rx) = mpsc::unbounded_channel();
    (Arc::new(GatedService { calls }), rx)
}

pub fn options(debounce: Duration) -> CoordinatorOptions {
    let mut config = ParkConfig::default();
    config.infra.session.debounce_ms = debounce.as_millis() as u64;
    CoordinatorOptions::from_config(&config)
}

/// A canonical answer with `drive` for Drive and the rest split evenly.
pub fn rebalanced(drive: f64) -> ComputationResult {
    let rest = (100.0 - drive) / 4.0;
    let shares = serde_json::json!({
        "processed_mode_shares": {
            "Bike": rest,
            "Carpool": rest,
            "Drive": drive,
            "Transit": rest,
            "Walk": rest,
        },
        "years": [2025, 2026, 2027, 2028, 2029],
    });
    serde_json::from_value(shares).expect("fixture result")
}
