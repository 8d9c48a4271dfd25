//! Core session types: parameters, edit intents, tokens and results.

use parkconf::BaselineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::validate::{parse_number, parse_series};

/// A scalar input: either a committed number or in-progress text.
///
/// Serialized untagged, so a share goes over the wire as a JSON number or a
/// JSON string exactly as the user left it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(f64),
    Raw(String),
}

impl InputValue {
    /// Numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            InputValue::Number(n) if n.is_finite() => Some(*n),
            InputValue::Number(_) => None,
            InputValue::Raw(text) => parse_number(text),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, InputValue::Raw(_))
    }
}

impl From<f64> for InputValue {
    fn from(n: f64) -> Self {
        InputValue::Number(n)
    }
}

/// A per-year series input: committed values or in-progress comma-separated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesInput {
    Values(Vec<f64>),
    Raw(String),
}

impl SeriesInput {
    /// Permissive numeric reading; see [`parse_series`].
    pub fn values(&self) -> Vec<f64> {
        match self {
            SeriesInput::Values(values) => values.iter().copied().filter(|v| v.is_finite()).collect(),
            SeriesInput::Raw(text) => parse_series(text),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, SeriesInput::Raw(_))
    }
}

/// The full set of user-editable model inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub mode_shares: BTreeMap<String, InputValue>,
    pub population: SeriesInput,
    pub parking_supply: SeriesInput,
    pub cost_per_space: InputValue,
}

impl ParameterSet {
    pub fn from_baseline(baseline: &BaselineConfig) -> Self {
        Self {
            mode_shares: baseline
                .mode_shares
                .iter()
                .map(|(mode, share)| (mode.clone(), InputValue::Number(*share)))
                .collect(),
            population: SeriesInput::Values(baseline.population.clone()),
            parking_supply: SeriesInput::Values(baseline.parking_supply.clone()),
            cost_per_space: InputValue::Number(baseline.parking_cost_per_space),
        }
    }
}

/// An editable field of the [`ParameterSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Share of the named travel mode, in percent.
    Share(String),
    Population,
    ParkingSupply,
    CostPerSpace,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Share(mode) => write!(f, "share[{}]", mode),
            Field::Population => write!(f, "population"),
            Field::ParkingSupply => write!(f, "parking_supply"),
            Field::CostPerSpace => write!(f, "cost_per_space"),
        }
    }
}

/// Numeric value carried by a discrete commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommitValue {
    Scalar(f64),
    Series(Vec<f64>),
}

/// What presentation components emit. They never touch state directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Continuous edit: drag event or keystroke. Coalesced by the debounce window.
    Edit { field: Field, value: String },
    /// Discrete commit: slider release, blur or Enter. Dispatches immediately.
    /// Without a value the field's current buffer is committed.
    Commit {
        field: Field,
        #[serde(default)]
        value: Option<CommitValue>,
    },
    /// Restore the baseline scenario and recompute immediately.
    Reset,
}

/// The share the user last moved, sent so the service can rebalance the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeChange {
    pub mode: String,
    pub percent: f64,
}

/// Monotonically increasing request generation.
///
/// Only the response tagged with the latest dispatched token may touch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub u64);

impl RequestToken {
    pub fn next(self) -> Self {
        RequestToken(self.0 + 1)
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A successful response from the Computation Service.
///
/// Only `processed_mode_shares` is interpreted here; the rest (years,
/// parking series, summary table) is handed to presentation untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    pub processed_mode_shares: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub presentation: serde_json::Map<String, serde_json::Value>,
}

impl ComputationResult {
    pub fn years(&self) -> Option<&serde_json::Value> {
        self.presentation.get("years")
    }

    pub fn summary_table(&self) -> Option<&serde_json::Value> {
        self.presentation.get("summary_table")
    }
}
