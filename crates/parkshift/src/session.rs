//! One editing session: a single task owning the coordinator, fed by an
//! intent channel and by completions of its own service calls.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::client::ComputeService;
use crate::coordinator::{Completion, Coordinator, CoordinatorOptions, DispatchState};
use crate::types::Intent;
use crate::view::ViewState;

#[derive(Debug, thiserror::Error)]
pub enum SessionClosed {
    #[error("session {0} is no longer running")]
    Closed(Uuid),
}

/// Handle to a running session.
pub struct SessionHandle {
    id: Uuid,
    intents: mpsc::UnboundedSender<Intent>,
    view: watch::Receiver<ViewState>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Start a session on the current runtime.
    pub fn spawn(options: CoordinatorOptions, service: Arc<dyn ComputeService>) -> Self {
        let id = Uuid::new_v4();
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewState::new(options.baseline.clone()));
        let shutdown = CancellationToken::new();

        let coordinator = Coordinator::new(options, service, completions_tx, view_tx);
        let span = tracing::info_span!("session", %id);
        let task = tokio::spawn(
            reactor_task(coordinator, intents_rx, completions_rx, shutdown.clone())
                .instrument(span),
        );

        Self {
            id,
            intents: intents_tx,
            view: view_rx,
            shutdown,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn send(&self, intent: Intent) -> Result<(), SessionClosed> {
        self.intents
            .send(intent)
            .map_err(|_| SessionClosed::Closed(self.id))
    }

    /// A receiver that sees every published view change.
    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Stop accepting intents and wait until pending work settles: an open
    /// window fires and the latest request is answered.
    pub async fn finish(self) {
        let Self { id, intents, task, .. } = self;
        drop(intents);
        join(id, task).await;
    }

    /// Stop the loop now and wait for it. Calls still in flight finish on
    /// their own and their completions are dropped.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        join(self.id, self.task).await;
    }
}

async fn join(id: Uuid, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(%id, error = %e, "session task ended abnormally");
    }
}

async fn reactor_task(
    mut coordinator: Coordinator,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
    shutdown: CancellationToken,
) {
    info!("session started");
    let mut closing = false;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("shutdown requested");
                break;
            }

            // Completions before intents, so a response that already arrived
            // is applied ahead of edits queued behind it.
            Some(completion) = completions.recv() => {
                coordinator.handle_completion(completion);
            }

            intent = intents.recv(), if !closing => {
                match intent {
                    Some(intent) => coordinator.handle_intent(intent),
                    None => {
                        debug!("intent channel closed, draining");
                        closing = true;
                    }
                }
            }

            _ = coordinator.debounce_elapsed() => {
                coordinator.handle_debounce_elapsed();
            }
        }

        if closing && matches!(coordinator.state(), DispatchState::Idle) {
            break;
        }
    }

    info!(
        state = coordinator.state().name(),
        latest = %coordinator.latest_token(),
        "session stopped"
    );
}
