//! Bootstrap configuration - seeds the session, then the session owns it.

use std::collections::BTreeMap;

/// Default mode split. Sums to 100.
pub fn default_mode_shares() -> BTreeMap<String, f64> {
    let mut shares = BTreeMap::new();
    shares.insert("Drive".to_string(), 71.0);
    shares.insert("Transit".to_string(), 12.0);
    shares.insert("Walk".to_string(), 9.0);
    shares.insert("Bike".to_string(), 5.0);
    shares.insert("Carpool".to_string(), 3.0);
    shares
}

/// Baseline scenario a session starts from and returns to on reset.
///
/// The configured modes are exactly the keys of `mode_shares`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineConfig {
    /// Percent share per travel mode.
    pub mode_shares: BTreeMap<String, f64>,

    /// Population per modelled year.
    pub population: Vec<f64>,

    /// Parking capacity per modelled year.
    pub parking_supply: Vec<f64>,

    /// Cost of building one parking space.
    pub parking_cost_per_space: f64,
}

impl BaselineConfig {
    fn default_population() -> Vec<f64> {
        vec![10000.0, 10200.0, 10400.0, 10600.0, 10800.0]
    }

    fn default_parking_supply() -> Vec<f64> {
        vec![5000.0, 5100.0, 5100.0, 5200.0, 5200.0]
    }

    fn default_parking_cost_per_space() -> f64 {
        5000.0
    }

    /// Configured travel modes, in map order.
    pub fn modes(&self) -> Vec<String> {
        self.mode_shares.keys().cloned().collect()
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            mode_shares: default_mode_shares(),
            population: Self::default_population(),
            parking_supply: Self::default_parking_supply(),
            parking_cost_per_space: Self::default_parking_cost_per_space(),
        }
    }
}

/// Bootstrap configuration - seeds the session, then the session owns it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapConfig {
    /// Starting scenario
    pub baseline: BaselineConfig,
}
