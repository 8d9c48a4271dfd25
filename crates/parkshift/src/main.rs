use anyhow::{Context, Result};
use clap::Parser;
use parkconf::ParkConfig;
use parkshift::{CoordinatorOptions, HttpComputeClient, Intent, SessionHandle, ViewState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

/// Headless parking scenario session.
///
/// Reads one JSON intent per line on stdin and writes the session view as
/// JSON on stdout every time it changes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file, used in place of ./parkshift.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Calculation endpoint, overriding config and environment
    #[arg(long)]
    service_url: Option<String>,

    /// Quiescence window in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = ParkConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = cli.service_url {
        config.infra.service.url = url;
    }
    if let Some(ms) = cli.debounce_ms {
        config.infra.session.debounce_ms = ms;
    }

    if cli.dump_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    parkshift::telemetry::init(&config.infra.telemetry.log_level)
        .context("Failed to initialize logging")?;

    for file in &sources.files {
        tracing::info!(path = %file.display(), "loaded config file");
    }
    for var in &sources.env_overrides {
        tracing::info!(%var, "config overridden from environment");
    }

    let client = HttpComputeClient::new(&config.infra.service.url, config.service_timeout())
        .context("Failed to create calculation service client")?;
    tracing::info!(
        url = client.url(),
        debounce_ms = config.infra.session.debounce_ms,
        modes = ?config.bootstrap.baseline.modes(),
        "starting session"
    );

    let session = SessionHandle::spawn(CoordinatorOptions::from_config(&config), Arc::new(client));
    let printer = tokio::spawn(print_views(session.view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break true;
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => forward(&session, &line)?,
                    None => break false,
                }
            }
        }
    };

    let id = session.id();
    if interrupted {
        session.shutdown().await;
    } else {
        session.finish().await;
    }
    printer
        .await
        .context("View printer panicked")?
        .context("Failed to write view")?;

    tracing::info!(%id, "session closed");
    Ok(())
}

fn forward(session: &SessionHandle, line: &str) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<Intent>(line) {
        Ok(intent) => session.send(intent)?,
        Err(e) => tracing::warn!(error = %e, line, "skipping malformed intent"),
    }
    Ok(())
}

/// Write the current view, then one line per change until the session ends.
async fn print_views(mut view: watch::Receiver<ViewState>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    loop {
        let json = serde_json::to_string(&*view.borrow_and_update())?;
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;

        if view.changed().await.is_err() {
            return Ok(());
        }
    }
}
