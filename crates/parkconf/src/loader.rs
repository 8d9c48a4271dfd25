//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ParkConfig};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/parkshift/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("parkshift/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("parkshift.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and overlay its values onto `config`.
pub fn load_into(config: &mut ParkConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay the keys present in `contents` onto `config`.
///
/// Keys missing from the file keep whatever earlier layers set, so files
/// stack the way the discovery order promises.
pub(crate) fn apply_toml(
    config: &mut ParkConfig,
    contents: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(service) = table.get("service").and_then(|v| v.as_table()) {
        if let Some(v) = service.get("url").and_then(|v| v.as_str()) {
            config.infra.service.url = v.to_string();
        }
        if let Some(v) = service.get("timeout_ms").and_then(|v| v.as_integer()) {
            config.infra.service.timeout_ms = non_negative(v, "service.timeout_ms", path)?;
        }
    }

    if let Some(session) = table.get("session").and_then(|v| v.as_table()) {
        if let Some(v) = session.get("debounce_ms").and_then(|v| v.as_integer()) {
            config.infra.session.debounce_ms = non_negative(v, "session.debounce_ms", path)?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_level = v.to_string();
        }
    }

    let baseline_section = table
        .get("bootstrap")
        .and_then(|v| v.as_table())
        .and_then(|b| b.get("baseline"))
        .and_then(|v| v.as_table());

    if let Some(baseline) = baseline_section {
        let target = &mut config.bootstrap.baseline;

        // A file that names modes defines the whole mode set.
        if let Some(shares) = baseline.get("mode_shares").and_then(|v| v.as_table()) {
            let mut parsed = BTreeMap::new();
            for (mode, value) in shares {
                let key = format!("bootstrap.baseline.mode_shares.{mode}");
                parsed.insert(mode.clone(), number(value, &key, path)?);
            }
            target.mode_shares = parsed;
        }
        if let Some(values) = baseline.get("population").and_then(|v| v.as_array()) {
            target.population = numbers(values, "bootstrap.baseline.population", path)?;
        }
        if let Some(values) = baseline.get("parking_supply").and_then(|v| v.as_array()) {
            target.parking_supply = numbers(values, "bootstrap.baseline.parking_supply", path)?;
        }
        if let Some(v) = baseline.get("parking_cost_per_space") {
            target.parking_cost_per_space =
                number(v, "bootstrap.baseline.parking_cost_per_space", path)?;
        }
    }

    Ok(())
}

fn number(value: &toml::Value, key: &str, path: &Path) -> Result<f64, ConfigError> {
    match value {
        toml::Value::Float(f) => Ok(*f),
        toml::Value::Integer(i) => Ok(*i as f64),
        _ => Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            key: key.to_string(),
            message: "expected a number".to_string(),
        }),
    }
}

fn numbers(values: &[toml::Value], key: &str, path: &Path) -> Result<Vec<f64>, ConfigError> {
    values.iter().map(|v| number(v, key, path)).collect()
}

fn non_negative(value: i64, key: &str, path: &Path) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::Invalid {
        path: path.to_path_buf(),
        key: key.to_string(),
        message: format!("expected a non-negative integer, got {value}"),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ParkConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("PARKSHIFT_SERVICE_URL") {
        config.infra.service.url = v;
        sources.env_overrides.push("PARKSHIFT_SERVICE_URL".to_string());
    }
    if let Ok(v) = env::var("PARKSHIFT_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.infra.service.timeout_ms = ms;
            sources.env_overrides.push("PARKSHIFT_TIMEOUT_MS".to_string());
        }
    }
    if let Ok(v) = env::var("PARKSHIFT_DEBOUNCE_MS") {
        if let Ok(ms) = v.parse() {
            config.infra.session.debounce_ms = ms;
            sources.env_overrides.push("PARKSHIFT_DEBOUNCE_MS".to_string());
        }
    }
    if let Ok(v) = env::var("PARKSHIFT_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("PARKSHIFT_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}
