//! Input store: the session's single copy of the parameters.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{CommitValue, Field, InputValue, ParameterSet, SeriesInput};
use crate::validate::parse_series;

pub const SHARE_BOUNDS: (f64, f64) = (0.0, 100.0);

/// An intent the store cannot apply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Value does not fit field {0}")]
    ValueShape(Field),
}

#[derive(Debug, Clone)]
pub struct InputStore {
    params: ParameterSet,
}

impl InputStore {
    pub fn new(params: ParameterSet) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Store an in-progress value verbatim. No parsing, no clamping.
    pub fn apply_edit_intent(&mut self, field: &Field, raw: &str) -> Result<(), StoreError> {
        match field {
            Field::Share(mode) => {
                *self.share_mut(mode)? = InputValue::Raw(raw.to_string());
            }
            Field::Population => self.params.population = SeriesInput::Raw(raw.to_string()),
            Field::ParkingSupply => self.params.parking_supply = SeriesInput::Raw(raw.to_string()),
            Field::CostPerSpace => self.params.cost_per_space = InputValue::Raw(raw.to_string()),
        }
        Ok(())
    }

    /// Commit a field: clamp to its bounds and mark it no longer raw.
    ///
    /// With no value the current buffer is committed. A buffer that does not
    /// parse stays raw so the text remains editable.
    pub fn apply_commit(
        &mut self,
        field: &Field,
        value: Option<&CommitValue>,
    ) -> Result<(), StoreError> {
        match field {
            Field::Share(mode) => {
                let slot = self.share_mut(mode)?;
                let number = match value {
                    Some(CommitValue::Scalar(n)) => Some(*n),
                    Some(CommitValue::Series(_)) => return Err(StoreError::ValueShape(field.clone())),
                    None => slot.as_number(),
                };
                if let Some(n) = number.filter(|n| n.is_finite()) {
                    *slot = InputValue::Number(n.clamp(SHARE_BOUNDS.0, SHARE_BOUNDS.1));
                }
            }
            Field::CostPerSpace => {
                let number = match value {
                    Some(CommitValue::Scalar(n)) => Some(*n),
                    Some(CommitValue::Series(_)) => return Err(StoreError::ValueShape(field.clone())),
                    None => self.params.cost_per_space.as_number(),
                };
                if let Some(n) = number.filter(|n| n.is_finite()) {
                    self.params.cost_per_space = InputValue::Number(n.max(0.0));
                }
            }
            Field::Population | Field::ParkingSupply => {
                let slot = if *field == Field::Population {
                    &mut self.params.population
                } else {
                    &mut self.params.parking_supply
                };
                let values = match value {
                    Some(CommitValue::Series(values)) => values.clone(),
                    Some(CommitValue::Scalar(_)) => return Err(StoreError::ValueShape(field.clone())),
                    None => match slot {
                        SeriesInput::Values(values) => values.clone(),
                        SeriesInput::Raw(text) => parse_series(text),
                    },
                };
                let values: Vec<f64> = values
                    .into_iter()
                    .filter(|v| v.is_finite())
                    .map(|v| v.max(0.0))
                    .collect();
                if !values.is_empty() {
                    *slot = SeriesInput::Values(values);
                }
            }
        }
        Ok(())
    }

    /// Replace the whole share map with canonical values, if they differ.
    ///
    /// Returns `true` when the map changed. Other fields are never touched.
    pub fn apply_reconciled_set(&mut self, canonical: &BTreeMap<String, f64>) -> bool {
        if shares_match(&self.params.mode_shares, canonical) {
            return false;
        }
        self.params.mode_shares = canonical
            .iter()
            .map(|(mode, share)| (mode.clone(), InputValue::Number(*share)))
            .collect();
        true
    }

    pub fn reset(&mut self, baseline: &ParameterSet) {
        self.params = baseline.clone();
    }

    fn share_mut(&mut self, mode: &str) -> Result<&mut InputValue, StoreError> {
        self.params
            .mode_shares
            .get_mut(mode)
            .ok_or_else(|| StoreError::UnknownMode(mode.to_string()))
    }
}

/// Numeric-normalized comparison: `"71.0"`, `71` and `71.0` are equal.
pub fn shares_match(current: &BTreeMap<String, InputValue>, canonical: &BTreeMap<String, f64>) -> bool {
    current.len() == canonical.len()
        && canonical.iter().all(|(mode, share)| {
            current
                .get(mode)
                .and_then(InputValue::as_number)
                .is_some_and(|n| (n - share).abs() <= 1e-9)
        })
}
