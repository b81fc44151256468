//! # Test Run Records
//!
//! The JSON document posted to the SpiraTest `test-runs/record` route, one
//! per executed test.

use std::fmt::{self, Display};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize, Serializer};

/// Name reported to Spira as the originating automation engine.
pub const RUNNER_NAME: &str = "JestJS";

/// Identifier of a Spira artifact (test case, release, test set, project).
///
/// Spira accepts both numeric ids and their string form; the value is sent
/// back exactly as it was configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpiraId {
    Number(i64),
    Text(String),
}

impl Display for SpiraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiraId::Number(id) => write!(f, "{id}"),
            SpiraId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for SpiraId {
    fn from(id: i64) -> Self {
        SpiraId::Number(id)
    }
}

impl From<&str> for SpiraId {
    fn from(id: &str) -> Self {
        SpiraId::Text(id.to_string())
    }
}

/// Spira execution status. The discriminants are Spira's `ExecutionStatusId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Failed = 1,
    Passed = 2,
    NotRun = 3,
}

impl ExecutionStatus {
    /// Map a host status string. Anything that is not `passed` or `pending`
    /// counts as a failure.
    pub fn from_host_status(status: &str) -> Self {
        match status {
            "passed" => ExecutionStatus::Passed,
            "pending" => ExecutionStatus::NotRun,
            _ => ExecutionStatus::Failed,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn message(self) -> &'static str {
        match self {
            ExecutionStatus::Failed => "Test Failed",
            ExecutionStatus::Passed => "Test Succeeded",
            ExecutionStatus::NotRun => "Test Not Run",
        }
    }
}

impl Serialize for ExecutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

/// One test outcome as Spira expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunRecord {
    pub test_case_id: SpiraId,
    pub runner_name: &'static str,
    pub runner_test_name: String,
    pub runner_stack_trace: String,
    #[serde(rename = "ExecutionStatusId")]
    pub execution_status: ExecutionStatus,
    pub start_date: String,
    pub runner_message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_id: Option<SpiraId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_set_id: Option<SpiraId>,
}

/// Join failure messages, each terminated by a newline.
pub fn stack_trace(failure_messages: &[String]) -> String {
    let mut trace = String::new();
    for message in failure_messages {
        trace.push_str(message);
        trace.push('\n');
    }
    trace
}

/// Format a timestamp the way Spira's WCF endpoint parses dates.
pub fn spira_date(epoch_ms: u64) -> String {
    format!("/Date({epoch_ms}-0000)/")
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
