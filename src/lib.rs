//! Relays Jest test results to SpiraTest.
//!
//! A [`ResultRelay`] is created once per run from the reporter options,
//! receives every finished suite through [`ResultRelay::on_test_result`] and
//! posts one test run per result when [`ResultRelay::on_run_complete`] is
//! awaited.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod record;
pub mod relay;
pub mod storage;
pub mod testing;

pub use config::{RelayConfig, RelayOptions, TestCaseMap, normalize_title};
pub use error::{ConfigError, RelayError, RelayResult};
pub use record::{ExecutionStatus, SpiraId, TestRunRecord};
pub use relay::{CompletionMode, FlushReport, ResultRelay};
pub use testing::{AggregatedResults, SuiteResult, TestResult};
