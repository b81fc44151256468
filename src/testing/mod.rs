//! # Host Test Results
//!
//! Shapes of the events a Jest-like host hands to the relay: one
//! [`SuiteResult`] per finished test file, and the aggregated document
//! `jest --json` writes at the end of a run.

use serde::Deserialize;

/// Outcome of a single `it`/`test` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub failure_messages: Vec<String>,
}

impl TestResult {
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: status.into(),
            failure_messages: Vec::new(),
        }
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_messages.push(message.into());
        self
    }
}

/// Results of one completed test file, in execution order.
///
/// The reporter API calls the list `testResults`; the `--json` output calls
/// it `assertionResults`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    #[serde(default, alias = "assertionResults")]
    pub test_results: Vec<TestResult>,
}

impl SuiteResult {
    pub fn new(test_results: Vec<TestResult>) -> Self {
        Self { test_results }
    }
}

/// The whole-run document produced by `jest --json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResults {
    #[serde(default)]
    pub test_results: Vec<SuiteResult>,
}
