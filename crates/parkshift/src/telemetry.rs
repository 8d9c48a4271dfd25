//! Tracing setup.
//!
//! Logs go to stderr so stdout stays a clean stream of view updates.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` from config applies.
pub fn init(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(log_level))
            .with_context(|| format!("Invalid log level {:?}", log_level))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn default_directives(log_level: &str) -> String {
    // The HTTP stack is chatty at debug.
    format!("{},hyper_util=warn,reqwest=warn", log_level)
}
