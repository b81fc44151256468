//! # Result Relay
//!
//! The reporter a host drives through a run: configure once, feed it every
//! finished suite, then flush when the run completes.
//!
//! Records are kept in report order. A flush only removes the records that
//! were pending when it started, and only once it has completed.

pub mod flush;

use serde_json::Value;
use tracing::{debug, error};

use crate::config::{RelayConfig, RelayOptions};
use crate::error::{ConfigError, RelayResult};
use crate::record::{self, ExecutionStatus, RUNNER_NAME, TestRunRecord};
use crate::testing::{SuiteResult, TestResult};

pub use flush::{CompletionMode, FlushReport};

#[derive(Debug)]
enum RelayState {
    Ready(RelayConfig),
    /// Options were rejected; host events are accepted and ignored.
    Disabled(Vec<ConfigError>),
}

/// Collects test results and posts them to Spira at the end of a run.
#[derive(Debug)]
pub struct ResultRelay {
    state: RelayState,
    pending: Vec<TestRunRecord>,
}

impl ResultRelay {
    /// Build from the host's raw arguments. The global config is accepted
    /// for signature parity with the host and otherwise unused.
    pub fn new(_global_config: &Value, options: Value) -> Self {
        match RelayConfig::from_value(options) {
            Ok(config) => Self::from_config(config),
            Err(errors) => Self::disabled(errors),
        }
    }

    /// Never fails. Problems are logged once each and leave the relay
    /// disabled so the rest of the run is unaffected.
    pub fn from_options(options: RelayOptions) -> Self {
        match RelayConfig::from_options(options) {
            Ok(config) => Self::from_config(config),
            Err(errors) => Self::disabled(errors),
        }
    }

    pub fn from_config(config: RelayConfig) -> Self {
        debug!(
            project = %config.project_id(),
            mapped_test_cases = config.test_cases().len(),
            "Spira reporter configured"
        );
        Self {
            state: RelayState::Ready(config),
            pending: Vec::new(),
        }
    }

    fn disabled(errors: Vec<ConfigError>) -> Self {
        for err in &errors {
            error!(target: "spira_relay::config", %err, "Spira reporter disabled");
        }
        Self {
            state: RelayState::Disabled(errors),
            pending: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, RelayState::Ready(_))
    }

    pub fn config(&self) -> Option<&RelayConfig> {
        match &self.state {
            RelayState::Ready(config) => Some(config),
            RelayState::Disabled(_) => None,
        }
    }

    pub fn config_errors(&self) -> &[ConfigError] {
        match &self.state {
            RelayState::Ready(_) => &[],
            RelayState::Disabled(errors) => errors,
        }
    }

    /// Records waiting for the next flush, in report order.
    pub fn pending(&self) -> &[TestRunRecord] {
        &self.pending
    }

    /// Called once per finished suite. Appends one record per result.
    pub fn on_test_result(&mut self, suite: &SuiteResult) {
        let RelayState::Ready(config) = &self.state else {
            debug!(
                results = suite.test_results.len(),
                "Spira reporter disabled, dropping results"
            );
            return;
        };

        let started_at = record::now_ms();
        self.pending.extend(
            suite
                .test_results
                .iter()
                .map(|result| build_record(config, result, started_at)),
        );
    }

    /// Called once when the run is over. Resolves after the pending records
    /// have been flushed, see [`CompletionMode`].
    pub async fn on_run_complete(&mut self) -> RelayResult<FlushReport> {
        let RelayState::Ready(config) = &self.state else {
            debug!("Spira reporter disabled, nothing sent");
            return Ok(FlushReport::default());
        };

        let flushed = self.pending.len();
        let report = flush::flush_batch(config, &self.pending[..flushed]).await?;
        self.pending.drain(..flushed);
        Ok(report)
    }
}

/// Map one host result onto a Spira test run.
pub fn build_record(config: &RelayConfig, result: &TestResult, started_at_ms: u64) -> TestRunRecord {
    let status = ExecutionStatus::from_host_status(&result.status);
    TestRunRecord {
        test_case_id: config.test_cases().resolve(&result.title).clone(),
        runner_name: RUNNER_NAME,
        runner_test_name: result.title.clone(),
        runner_stack_trace: record::stack_trace(&result.failure_messages),
        execution_status: status,
        start_date: record::spira_date(started_at_ms),
        runner_message: status.message(),
        release_id: config.release_id().cloned(),
        test_set_id: config.test_set_id().cloned(),
    }
}
