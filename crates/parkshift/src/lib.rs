//! parkshift: keeps a what-if parking scenario in sync with the
//! calculation service while the user edits it.
//!
//! Edits are coalesced, validated locally, and sent one request per quiet
//! period. Every request carries a [`RequestToken`]; only the answer to the
//! newest one is ever applied, so results can arrive in any order.
//!
//! ```text
//! intents ──▶ InputStore ──▶ Validator ──▶ Coordinator ──▶ ComputeService
//!                 ▲                             │                 │
//!                 └──────── reconcile ◀─────────┴── Completion ◀──┘
//! ```

pub mod client;
pub mod coordinator;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validate;
pub mod view;

pub use client::{ComputeService, HttpComputeClient, ServiceError, GENERIC_TRANSPORT_ERROR};
pub use coordinator::{Completion, Coordinator, CoordinatorOptions, DispatchState};
pub use session::{SessionClosed, SessionHandle};
pub use store::{InputStore, StoreError};
pub use types::{
    CommitValue, ComputationResult, Field, InputValue, Intent, ModeChange, ParameterSet,
    RequestToken, SeriesInput,
};
pub use validate::{ValidatedPayload, ValidationError, Validator};
pub use view::{SessionError, SessionStats, ViewState};
