//! Loading of the JSON documents the replay binary consumes.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RelayError, RelayResult};
use crate::testing::AggregatedResults;

/// Read the reporter options block, e.g. the second element of a Jest
/// `reporters` entry saved to its own file.
pub fn load_options(path: &Path) -> RelayResult<Value> {
    load_json(path)
}

/// Read the document written by `jest --json --outputFile=<path>`.
pub fn load_results(path: &Path) -> RelayResult<AggregatedResults> {
    load_json(path)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> RelayResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| RelayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RelayError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
