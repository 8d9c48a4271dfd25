//! Pre-dispatch validation.
//!
//! Editing is allowed to leave the parameters in any state. Nothing reaches
//! the Computation Service until it passes [`Validator::validate`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::types::{InputValue, ModeChange, ParameterSet};

/// Why a parameter set cannot be sent. First failing check wins.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Population must contain at least one number")]
    MissingPopulation,

    #[error("Parking supply must contain at least one number")]
    MissingSupply,

    #[error("Cost per space must be a number of zero or more")]
    InvalidCost,

    #[error("Population has {population} years but parking supply has {supply}")]
    LengthMismatch { population: usize, supply: usize },

    #[error("No share given for mode {mode}")]
    MissingModeShare { mode: String },
}

/// Request body for the Computation Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPayload {
    pub mode_shares_input: BTreeMap<String, InputValue>,
    pub population_per_year: Vec<f64>,
    pub parking_supply_per_year: Vec<f64>,
    pub parking_cost_per_space: f64,
    pub changed_mode_key: Option<String>,
    pub new_value_percent: Option<f64>,
}

/// Checks a [`ParameterSet`] against the configured modes.
#[derive(Debug, Clone)]
pub struct Validator {
    modes: Vec<String>,
}

impl Validator {
    pub fn new(modes: Vec<String>) -> Self {
        Self { modes }
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    pub fn validate(
        &self,
        params: &ParameterSet,
        change: Option<&ModeChange>,
    ) -> Result<ValidatedPayload, ValidationError> {
        let population = params.population.values();
        if population.is_empty() {
            return Err(ValidationError::MissingPopulation);
        }

        let supply = params.parking_supply.values();
        if supply.is_empty() {
            return Err(ValidationError::MissingSupply);
        }

        let cost = match params.cost_per_space.as_number() {
            Some(cost) if cost >= 0.0 => cost,
            _ => return Err(ValidationError::InvalidCost),
        };

        if population.len() != supply.len() {
            return Err(ValidationError::LengthMismatch {
                population: population.len(),
                supply: supply.len(),
            });
        }

        if let Some(mode) = self
            .modes
            .iter()
            .find(|mode| !params.mode_shares.contains_key(*mode))
        {
            return Err(ValidationError::MissingModeShare { mode: mode.clone() });
        }

        Ok(ValidatedPayload {
            mode_shares_input: params.mode_shares.clone(),
            population_per_year: population,
            parking_supply_per_year: supply,
            parking_cost_per_space: cost,
            changed_mode_key: change.map(|c| c.mode.clone()),
            new_value_percent: change.map(|c| c.percent),
        })
    }
}

/// Parse a single number, ignoring surrounding whitespace.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse comma-separated numbers.
///
/// Permissive: empty tokens and tokens that are not numbers are dropped
/// rather than failing the whole series.
pub fn parse_series(text: &str) -> Vec<f64> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let parsed = parse_number(token);
            if parsed.is_none() {
                debug!(token, "dropping non-numeric series entry");
            }
            parsed
        })
        .collect()
}
