//! Tallybook scenario replay
//!
//! Loads a JSON scenario, replays it against an in-memory ledger and prints
//! the resulting state as JSON on stdout. Logs go to stderr.

mod replay;
mod scenario;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tallybook_shared::{AppConfig, LoggingConfig};

use crate::replay::Replay;
use crate::scenario::Scenario;

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let path = std::env::args()
        .nth(1)
        .context("usage: tallybook-replay <scenario.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("invalid scenario {path}"))?;
    info!(path = %path, steps = scenario.steps.len(), "replaying scenario");

    let mut replay = Replay::new(config.ledger, &scenario.accounts);
    replay.run(&scenario.steps);
    let report = replay.report()?;
    info!(
        headers = report.headers.len(),
        rejected = report.rejected.len(),
        "replay finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
