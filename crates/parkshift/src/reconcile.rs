//! Merges the service's canonical answer back into the input store.
//!
//! Only ever called for the latest token; the coordinator filters the rest.

use tracing::{debug, info, warn};

use crate::client::ServiceError;
use crate::store::InputStore;
use crate::types::{ComputationResult, RequestToken};

/// What reconciling one response did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The result is authoritative. `shares_changed` is false when the
    /// canonical split matched what the store already held.
    Applied {
        result: ComputationResult,
        shares_changed: bool,
    },
    /// The call failed. The store was not touched.
    Failed(ServiceError),
}

/// Apply the latest outcome. `modes` is the configured mode set; a share
/// map that does not name exactly those modes is treated as malformed.
pub fn reconcile(
    store: &mut InputStore,
    modes: &[String],
    token: RequestToken,
    outcome: Result<ComputationResult, ServiceError>,
) -> Reconciliation {
    let outcome = outcome.and_then(|result| match coverage_problem(modes, &result) {
        Some(problem) => Err(ServiceError::Malformed(problem)),
        None => Ok(result),
    });

    match outcome {
        Ok(result) => {
            // The map is swapped as a unit, never patched per mode.
            let shares_changed = store.apply_reconciled_set(&result.processed_mode_shares);
            if shares_changed {
                info!(%token, "applied canonical mode shares");
            } else {
                debug!(%token, "canonical mode shares unchanged");
            }
            Reconciliation::Applied {
                result,
                shares_changed,
            }
        }
        Err(error) => {
            warn!(%token, %error, "calculation failed, parameters left as edited");
            Reconciliation::Failed(error)
        }
    }
}

fn coverage_problem(modes: &[String], result: &ComputationResult) -> Option<String> {
    let shares = &result.processed_mode_shares;
    let missing: Vec<&str> = modes
        .iter()
        .filter(|mode| !shares.contains_key(*mode))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Some(format!(
            "processed_mode_shares is missing {}",
            missing.join(", ")
        ));
    }

    let unknown: Vec<&str> = shares
        .keys()
        .filter(|mode| !modes.contains(*mode))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Some(format!(
            "processed_mode_shares has unknown modes {}",
            unknown.join(", ")
        ));
    }
    None
}
