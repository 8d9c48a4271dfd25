//! Layered configuration loading for parkshift.
//!
//! # Configuration Philosophy
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): Things that cannot change while a
//!   session runs - the Computation Service endpoint, the debounce window,
//!   the log filter.
//!
//! - **Bootstrap** (`BootstrapConfig`): The baseline scenario that seeds the
//!   session's parameters. After startup the session is the source of truth;
//!   the baseline is only consulted again on reset.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/parkshift/config.toml` (system)
//! 2. `~/.config/parkshift/config.toml` (user)
//! 3. `./parkshift.toml` (local override, or the `--config` path)
//! 4. Environment variables (`PARKSHIFT_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [service]
//! url = "http://127.0.0.1:5000/api/calculate"
//! timeout_ms = 10000
//!
//! [session]
//! debounce_ms = 500
//!
//! [telemetry]
//! log_level = "info"
//!
//! [bootstrap.baseline]
//! population = [10000, 10200, 10400, 10600, 10800]
//! parking_supply = [5000, 5100, 5100, 5200, 5200]
//! parking_cost_per_space = 5000
//!
//! [bootstrap.baseline.mode_shares]
//! Drive = 71.0
//! Transit = 29.0
//! ```

pub mod bootstrap;
pub mod infra;
pub mod loader;

pub use bootstrap::{BaselineConfig, BootstrapConfig};
pub use infra::{InfraConfig, ServiceConfig, SessionConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key} in {path}: {message}")]
    Invalid {
        path: PathBuf,
        key: String,
        message: String,
    },
}

/// Complete parkshift configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParkConfig {
    /// Infrastructure - cannot change at runtime.
    pub infra: InfraConfig,

    /// Bootstrap - seeds the session.
    pub bootstrap: BootstrapConfig,
}

impl ParkConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an optional explicit file, then apply env
    /// overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./parkshift.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ParkConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// The debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.infra.session.debounce_ms)
    }

    /// The per-request service timeout as a `Duration`.
    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.infra.service.timeout_ms)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# parkshift configuration\n\n");

        output.push_str("[service]\n");
        output.push_str(&format!("url = \"{}\"\n", self.infra.service.url));
        output.push_str(&format!("timeout_ms = {}\n", self.infra.service.timeout_ms));

        output.push_str("\n[session]\n");
        output.push_str(&format!(
            "debounce_ms = {}\n",
            self.infra.session.debounce_ms
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.infra.telemetry.log_level
        ));

        let baseline = &self.bootstrap.baseline;
        output.push_str("\n[bootstrap.baseline]\n");
        output.push_str(&format!("population = {}\n", toml_array(&baseline.population)));
        output.push_str(&format!(
            "parking_supply = {}\n",
            toml_array(&baseline.parking_supply)
        ));
        output.push_str(&format!(
            "parking_cost_per_space = {:?}\n",
            baseline.parking_cost_per_space
        ));

        output.push_str("\n[bootstrap.baseline.mode_shares]\n");
        for (mode, share) in &baseline.mode_shares {
            output.push_str(&format!("{} = {:?}\n", toml_key(mode), share));
        }

        output
    }
}

/// Bare key when TOML allows one, quoted otherwise.
fn toml_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        toml::Value::String(key.to_string()).to_string()
    }
}

fn toml_array(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
    format!("[{}]", items.join(", "))
}
