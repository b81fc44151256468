//! # Replay CLI
//!
//! Sends a saved `jest --json` results file to Spira, for CI jobs that run
//! Jest without the live reporter.
//!
//! ```text
//! spira-relay --config spira.json --results jest-results.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tracing::info;

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::relay::{CompletionMode, FlushReport, ResultRelay};
use crate::storage;

#[derive(Debug, Clone, Parser)]
#[command(name = "spira-relay", version, about = "Record Jest results as Spira test runs")]
pub struct CliConfig {
    /// JSON file holding the reporter options.
    #[arg(long, env = "SPIRA_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output of `jest --json`.
    #[arg(long, env = "SPIRA_RELAY_RESULTS")]
    pub results: PathBuf,

    /// Wait for a response to every record, even if that never happens.
    #[arg(long)]
    pub legacy_completion: bool,

    /// Give up on the flush after this many milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl CliConfig {
    /// Validated config with command-line overrides applied.
    pub fn relay_config(&self, options: Value) -> RelayResult<RelayConfig> {
        let mut config = RelayConfig::from_value(options).map_err(RelayError::Config)?;
        if self.legacy_completion {
            config = config.with_completion(CompletionMode::Legacy);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_flush_timeout((ms > 0).then(|| Duration::from_millis(ms)));
        }
        Ok(config)
    }
}

/// Replay a results file through a fresh relay.
pub async fn run(cli: &CliConfig) -> RelayResult<FlushReport> {
    let options = storage::load_options(&cli.config)?;
    let results = storage::load_results(&cli.results)?;
    let config = cli.relay_config(options)?;

    let mut relay = ResultRelay::from_config(config);
    for suite in &results.test_results {
        relay.on_test_result(suite);
    }
    info!(records = relay.pending().len(), "replaying Jest results");

    relay.on_run_complete().await
}
