//! Dispatch coordinator: turns a stream of edit intents into an ordered
//! sequence of service calls and applies only the newest answer.
//!
//! # States
//!
//! ```text
//!            edit                 window elapses, valid
//!   Idle ───────────▶ PendingDebounce ───────────────────▶ InFlight
//!    ▲                  │  ▲   │ edit: restart window         │  ▲
//!    │ invalid          │  └───┘                              │  │ latest response,
//!    └──────────────────┘                               edit  │  │ no queued draft
//!                                                             ▼  │
//!                                               InFlightWithQueuedEdit
//! ```
//!
//! A discrete commit (slider release, blur, Enter, reset) skips the window
//! from any state and dispatches straight away with a fresh token.
//!
//! Every dispatch takes `latest + 1`. A completion whose token is not the
//! latest is dropped without touching state, so applied results are ordered
//! by dispatch, never by arrival. In-flight calls are never aborted.

use std::collections::BTreeMap;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, warn};

use crate::client::{ComputeService, ServiceError};
use crate::reconcile::{reconcile, Reconciliation};
use crate::store::InputStore;
use crate::types::{
    CommitValue, ComputationResult, Field, Intent, ModeChange, ParameterSet, RequestToken,
};
use crate::validate::{parse_number, ValidatedPayload, ValidationError, Validator};
use crate::view::{SessionError, SessionStats, ViewState};

/// A finished service call, reported back to the event loop.
#[derive(Debug)]
pub struct Completion {
    pub token: RequestToken,
    pub outcome: Result<ComputationResult, ServiceError>,
}

/// Edits coalesced since the last dispatch.
#[derive(Debug, Clone)]
pub struct Draft {
    /// Raw share text by mode, replayed over a reconciled map when the draft
    /// was queued behind an in-flight request.
    share_edits: BTreeMap<String, String>,
    last_change: Option<ModeChange>,
    last_edit: Instant,
}

impl Draft {
    fn new(now: Instant) -> Self {
        Self {
            share_edits: BTreeMap::new(),
            last_change: None,
            last_edit: now,
        }
    }

    fn record(&mut self, field: &Field, raw: &str, now: Instant) {
        if let Field::Share(mode) = field {
            self.share_edits.insert(mode.clone(), raw.to_string());
            self.last_change = parse_number(raw).map(|percent| ModeChange {
                mode: mode.clone(),
                percent,
            });
        }
        self.last_edit = now;
    }

    /// A committed share is replayed as its number. A change the draft
    /// already carries keeps its raw text.
    fn record_commit(&mut self, change: Option<ModeChange>, now: Instant) {
        if let Some(change) = change {
            if self.last_change.as_ref() != Some(&change) {
                self.share_edits
                    .insert(change.mode.clone(), change.percent.to_string());
                self.last_change = Some(change);
            }
        }
        self.last_edit = now;
    }

    pub fn last_change(&self) -> Option<&ModeChange> {
        self.last_change.as_ref()
    }
}

/// Owned, cancellable quiescence timer. Dropping it cancels it.
#[derive(Debug)]
pub struct DebounceTimer {
    sleep: Pin<Box<Sleep>>,
}

impl DebounceTimer {
    fn until(deadline: Instant) -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep_until(deadline)),
        }
    }

    fn restart(&mut self, deadline: Instant) {
        self.sleep.as_mut().reset(deadline);
    }

    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    async fn elapsed(&mut self) {
        self.sleep.as_mut().await
    }
}

#[derive(Debug)]
pub enum DispatchState {
    Idle,
    PendingDebounce {
        timer: DebounceTimer,
        draft: Draft,
    },
    InFlight {
        token: RequestToken,
        payload: ValidatedPayload,
    },
    InFlightWithQueuedEdit {
        token: RequestToken,
        payload: ValidatedPayload,
        draft: Draft,
    },
}

impl DispatchState {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchState::Idle => "idle",
            DispatchState::PendingDebounce { .. } => "pending_debounce",
            DispatchState::InFlight { .. } => "in_flight",
            DispatchState::InFlightWithQueuedEdit { .. } => "in_flight_with_queued_edit",
        }
    }

    fn draft(&self) -> Option<&Draft> {
        match self {
            DispatchState::PendingDebounce { draft, .. }
            | DispatchState::InFlightWithQueuedEdit { draft, .. } => Some(draft),
            _ => None,
        }
    }

    fn in_flight_token(&self) -> Option<RequestToken> {
        match self {
            DispatchState::InFlight { token, .. }
            | DispatchState::InFlightWithQueuedEdit { token, .. } => Some(*token),
            _ => None,
        }
    }
}

/// Static inputs for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub baseline: ParameterSet,
    pub modes: Vec<String>,
    pub debounce: Duration,
}

impl CoordinatorOptions {
    pub fn from_config(config: &parkconf::ParkConfig) -> Self {
        let baseline = &config.bootstrap.baseline;
        Self {
            baseline: ParameterSet::from_baseline(baseline),
            modes: baseline.modes(),
            debounce: config.debounce(),
        }
    }
}

pub struct Coordinator {
    store: InputStore,
    baseline: ParameterSet,
    validator: Validator,
    service: Arc<dyn ComputeService>,
    completions: mpsc::UnboundedSender<Completion>,
    view: watch::Sender<ViewState>,
    debounce: Duration,
    state: DispatchState,
    latest: RequestToken,
    result: Option<ComputationResult>,
    error: Option<SessionError>,
    applied: Option<RequestToken>,
    stats: SessionStats,
}

impl Coordinator {
    pub fn new(
        options: CoordinatorOptions,
        service: Arc<dyn ComputeService>,
        completions: mpsc::UnboundedSender<Completion>,
        view: watch::Sender<ViewState>,
    ) -> Self {
        let coordinator = Self {
            store: InputStore::new(options.baseline.clone()),
            baseline: options.baseline,
            validator: Validator::new(options.modes),
            service,
            completions,
            view,
            debounce: options.debounce,
            state: DispatchState::Idle,
            latest: RequestToken::default(),
            result: None,
            error: None,
            applied: None,
            stats: SessionStats::default(),
        };
        coordinator.publish();
        coordinator
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn params(&self) -> &ParameterSet {
        self.store.params()
    }

    pub fn latest_token(&self) -> RequestToken {
        self.latest
    }

    /// Resolves when the open quiescence window runs out. Pending forever
    /// when no window is open, so it can sit in a `select!` unconditionally.
    pub async fn debounce_elapsed(&mut self) {
        match &mut self.state {
            DispatchState::PendingDebounce { timer, .. } => timer.elapsed().await,
            _ => std::future::pending::<()>().await,
        }
    }

    pub fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Edit { field, value } => self.on_edit(field, value),
            Intent::Commit { field, value } => self.on_commit(field, value),
            Intent::Reset => {
                info!("resetting to baseline");
                self.store.reset(&self.baseline);
                self.commit(None);
            }
        }
        self.publish();
    }

    pub fn handle_debounce_elapsed(&mut self) {
        match mem::replace(&mut self.state, DispatchState::Idle) {
            DispatchState::PendingDebounce { draft, .. } => {
                debug!("quiescence window elapsed");
                self.validate_and_dispatch(draft.last_change);
            }
            other => self.state = other,
        }
        self.publish();
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        let Completion { token, outcome } = completion;

        if token != self.latest || self.state.in_flight_token() != Some(token) {
            debug!(%token, latest = %self.latest, "discarding superseded response");
            self.stats.superseded += 1;
            self.publish();
            return;
        }

        let queued = match mem::replace(&mut self.state, DispatchState::Idle) {
            DispatchState::InFlightWithQueuedEdit { draft, .. } => Some(draft),
            _ => None,
        };

        match reconcile(&mut self.store, self.validator.modes(), token, outcome) {
            Reconciliation::Applied { result, .. } => {
                self.result = Some(result);
                self.applied = Some(token);
                self.error = None;
                self.stats.applied += 1;
            }
            Reconciliation::Failed(error) => {
                self.error = Some(SessionError::Service(error));
                self.stats.service_failures += 1;
            }
        }

        if let Some(draft) = queued {
            self.drain(draft);
        }
        self.publish();
    }

    fn on_edit(&mut self, field: Field, raw: String) {
        if let Err(e) = self.store.apply_edit_intent(&field, &raw) {
            warn!(%field, error = %e, "edit rejected");
            self.stats.rejected_intents += 1;
            return;
        }

        let now = Instant::now();
        let deadline = now + self.debounce;
        self.state = match mem::replace(&mut self.state, DispatchState::Idle) {
            DispatchState::Idle => {
                let mut draft = Draft::new(now);
                draft.record(&field, &raw, now);
                DispatchState::PendingDebounce {
                    timer: DebounceTimer::until(deadline),
                    draft,
                }
            }
            DispatchState::PendingDebounce {
                mut timer,
                mut draft,
            } => {
                draft.record(&field, &raw, now);
                timer.restart(deadline);
                DispatchState::PendingDebounce { timer, draft }
            }
            DispatchState::InFlight { token, payload } => {
                let mut draft = Draft::new(now);
                draft.record(&field, &raw, now);
                debug!(%token, %field, "queued edit behind in-flight request");
                DispatchState::InFlightWithQueuedEdit {
                    token,
                    payload,
                    draft,
                }
            }
            DispatchState::InFlightWithQueuedEdit {
                token,
                payload,
                mut draft,
            } => {
                draft.record(&field, &raw, now);
                DispatchState::InFlightWithQueuedEdit {
                    token,
                    payload,
                    draft,
                }
            }
        };
    }

    fn on_commit(&mut self, field: Field, value: Option<CommitValue>) {
        if let Err(e) = self.store.apply_commit(&field, value.as_ref()) {
            warn!(%field, error = %e, "commit rejected");
            self.stats.rejected_intents += 1;
            return;
        }

        let change = match &field {
            Field::Share(mode) => self
                .store
                .params()
                .mode_shares
                .get(mode)
                .and_then(|v| v.as_number())
                .map(|percent| ModeChange {
                    mode: mode.clone(),
                    percent,
                }),
            // Keep the rebalancing hint of an edit the commit is about to fold in.
            _ => self.state.draft().and_then(|d| d.last_change.clone()),
        };
        self.commit(change);
    }

    /// Dispatch now, bypassing the window. A pending timer is cancelled and a
    /// queued draft is folded in, since the payload reads the current store.
    fn commit(&mut self, change: Option<ModeChange>) {
        let previous = mem::replace(&mut self.state, DispatchState::Idle);
        match self.validator.validate(self.store.params(), change.as_ref()) {
            Ok(payload) => {
                if let Some(token) = previous.in_flight_token() {
                    debug!(%token, "superseding in-flight request");
                }
                self.dispatch(payload);
            }
            Err(e) => {
                self.surface_validation(e);
                // An outstanding request stays the latest one. The rejected
                // commit waits behind it, so the answer cannot erase it.
                let (token, payload, draft) = match previous {
                    DispatchState::InFlight { token, payload } => (token, payload, None),
                    DispatchState::InFlightWithQueuedEdit {
                        token,
                        payload,
                        draft,
                    } => (token, payload, Some(draft)),
                    _ => return,
                };
                let now = Instant::now();
                let mut draft = draft.unwrap_or_else(|| Draft::new(now));
                draft.record_commit(change, now);
                debug!(%token, "queued rejected commit behind in-flight request");
                self.state = DispatchState::InFlightWithQueuedEdit {
                    token,
                    payload,
                    draft,
                };
            }
        }
    }

    /// Start the next cycle for an edit that arrived while a request was out.
    fn drain(&mut self, draft: Draft) {
        for (mode, raw) in &draft.share_edits {
            if let Err(e) = self
                .store
                .apply_edit_intent(&Field::Share(mode.clone()), raw)
            {
                debug!(error = %e, "queued share edit no longer applies");
            }
        }

        let deadline = draft.last_edit + self.debounce;
        if deadline <= Instant::now() {
            self.validate_and_dispatch(draft.last_change);
        } else {
            debug!("restarting quiescence window for queued edit");
            self.state = DispatchState::PendingDebounce {
                timer: DebounceTimer::until(deadline),
                draft,
            };
        }
    }

    fn validate_and_dispatch(&mut self, change: Option<ModeChange>) {
        match self.validator.validate(self.store.params(), change.as_ref()) {
            Ok(payload) => self.dispatch(payload),
            Err(e) => self.surface_validation(e),
        }
    }

    fn surface_validation(&mut self, error: ValidationError) {
        warn!(%error, "parameters invalid, not dispatching");
        self.stats.validation_failures += 1;
        self.error = Some(SessionError::Validation(error));
    }

    fn dispatch(&mut self, payload: ValidatedPayload) {
        let token = self.latest.next();
        self.latest = token;
        self.stats.dispatched += 1;
        self.error = None;

        info!(
            %token,
            changed_mode = ?payload.changed_mode_key,
            new_value = ?payload.new_value_percent,
            "dispatching calculation"
        );

        let service = Arc::clone(&self.service);
        let completions = self.completions.clone();
        let request = payload.clone();
        tokio::spawn(async move {
            let outcome = service.compute(request).await;
            // The loop may already be gone on shutdown.
            let _ = completions.send(Completion { token, outcome });
        });

        self.state = DispatchState::InFlight { token, payload };
    }

    fn publish(&self) {
        let next = ViewState {
            params: self.store.params().clone(),
            result: self.result.clone(),
            loading: self.state.in_flight_token().is_some(),
            error: self.error.clone(),
            applied_token: self.applied,
            stats: self.stats,
        };
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
