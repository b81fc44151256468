//! # Reporter Configuration
//!
//! Turns the loosely typed options block a host passes to the reporter into
//! an immutable [`RelayConfig`]. Validation is exhaustive: every problem is
//! collected so the user can fix them all in one pass.
//!
//! ```json
//! {
//!   "url": "https://demo.spiraservice.net/acme",
//!   "username": "fredbloggs",
//!   "token": "{7A05FD06-83C3-4436-B37F-51BCF0060483}",
//!   "projectId": 1,
//!   "testCases": { "default": 3, "Adds correctly": 4 },
//!   "releaseId": 5,
//!   "testSetId": 1
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ConfigError, RelayError};
use crate::http::Endpoint;
use crate::record::SpiraId;
use crate::relay::flush::CompletionMode;

/// Key of the fallback entry inside `testCases`.
pub const DEFAULT_TEST_CASE_KEY: &str = "default";

/// Options exactly as the host supplied them. Nothing is validated yet.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    pub url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub project_id: Option<SpiraId>,
    pub test_cases: Option<Map<String, Value>>,
    pub release_id: Option<SpiraId>,
    pub test_set_id: Option<SpiraId>,
    pub completion: Option<CompletionMode>,
    pub flush_timeout_ms: Option<u64>,
}

impl RelayOptions {
    /// Read every option on its own, so a badly typed value is reported
    /// under its own name and does not hide problems with the others.
    /// `null` counts as absent; unknown keys are ignored.
    pub fn parse(value: Value) -> Result<(Self, Vec<ConfigError>), ConfigError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::InvalidField {
                    field: "options".to_string(),
                    reason: format!("expected a JSON object, got `{other}`"),
                });
            }
        };

        let mut errors = Vec::new();
        let options = Self {
            url: take_field(&mut map, &["url", "serviceUrl"], &mut errors),
            username: take_field(&mut map, &["username"], &mut errors),
            token: take_field(&mut map, &["token"], &mut errors),
            project_id: take_field(&mut map, &["projectId"], &mut errors),
            test_cases: take_field(&mut map, &["testCases"], &mut errors),
            release_id: take_field(&mut map, &["releaseId"], &mut errors),
            test_set_id: take_field(&mut map, &["testSetId"], &mut errors),
            completion: take_field(&mut map, &["completion"], &mut errors),
            flush_timeout_ms: take_field(&mut map, &["flushTimeoutMs"], &mut errors),
        };
        Ok((options, errors))
    }
}

/// Remove the first of `keys` present in `map` and decode it. Errors are
/// reported under the first key.
fn take_field<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    keys: &[&'static str],
    errors: &mut Vec<ConfigError>,
) -> Option<T> {
    let value = keys.iter().find_map(|key| map.remove(*key))?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(ConfigError::InvalidField {
                field: keys[0].to_string(),
                reason: err.to_string(),
            });
            None
        }
    }
}

/// Lowercase a title and drop everything outside `[a-z0-9]`.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Test-case lookup keyed by normalized title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseMap {
    default: SpiraId,
    by_title: HashMap<String, SpiraId>,
}

impl TestCaseMap {
    pub fn new(default: SpiraId) -> Self {
        Self {
            default,
            by_title: HashMap::new(),
        }
    }

    /// Register `title`. Titles that normalize to the same key overwrite
    /// each other; the last one inserted wins.
    pub fn insert(&mut self, title: &str, id: SpiraId) {
        self.by_title.insert(normalize_title(title), id);
    }

    /// Exact match on the normalized title, else the default test case.
    pub fn resolve(&self, title: &str) -> &SpiraId {
        self.by_title
            .get(&normalize_title(title))
            .unwrap_or(&self.default)
    }

    pub fn default_id(&self) -> &SpiraId {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

/// Validated reporter configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    service_url: String,
    endpoint: Endpoint,
    username: String,
    token: String,
    project_id: SpiraId,
    test_cases: TestCaseMap,
    release_id: Option<SpiraId>,
    test_set_id: Option<SpiraId>,
    completion: CompletionMode,
    flush_timeout: Option<Duration>,
}

impl RelayConfig {
    pub fn from_value(value: Value) -> Result<Self, Vec<ConfigError>> {
        let (options, errors) = RelayOptions::parse(value).map_err(|err| vec![err])?;
        Self::validate(options, errors)
    }

    pub fn from_options(options: RelayOptions) -> Result<Self, Vec<ConfigError>> {
        Self::validate(options, Vec::new())
    }

    fn validate(options: RelayOptions, mut errors: Vec<ConfigError>) -> Result<Self, Vec<ConfigError>> {
        let service_url = required(options.url, "url", &mut errors);
        let username = required(options.username, "username", &mut errors);
        let token = required(options.token, "token", &mut errors);
        let project_id = options.project_id.filter(|id| !is_blank(id));
        if project_id.is_none() && !reported(&errors, "projectId") {
            errors.push(ConfigError::MissingField("projectId"));
        }

        let test_cases = match options.test_cases {
            Some(table) => build_test_cases(table, &mut errors),
            None => {
                if !reported(&errors, "testCases") {
                    errors.push(ConfigError::MissingTestCases);
                }
                None
            }
        };

        // The route is checked even when credentials are missing, so a bad
        // URL is reported together with everything else.
        let endpoint = service_url.as_deref().and_then(|url| {
            let placeholder = SpiraId::Number(0);
            let endpoint = Endpoint::for_project(
                url,
                project_id.as_ref().unwrap_or(&placeholder),
                username.as_deref().unwrap_or_default(),
                token.as_deref().unwrap_or_default(),
            );
            match endpoint {
                Ok(endpoint) => Some(endpoint),
                Err(err) => {
                    let reason = match err {
                        RelayError::InvalidUrl { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    errors.push(ConfigError::InvalidField {
                        field: "url".to_string(),
                        reason,
                    });
                    None
                }
            }
        });

        match (service_url, endpoint, username, token, project_id, test_cases) {
            (
                Some(service_url),
                Some(endpoint),
                Some(username),
                Some(token),
                Some(project_id),
                Some(test_cases),
            ) if errors.is_empty() => Ok(Self {
                service_url,
                endpoint,
                username,
                token,
                project_id,
                test_cases,
                release_id: options.release_id,
                test_set_id: options.test_set_id,
                completion: options.completion.unwrap_or_default(),
                flush_timeout: options
                    .flush_timeout_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis),
            }),
            _ => Err(errors),
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// The project's `test-runs/record` route, checked at intake.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn project_id(&self) -> &SpiraId {
        &self.project_id
    }

    pub fn test_cases(&self) -> &TestCaseMap {
        &self.test_cases
    }

    pub fn release_id(&self) -> Option<&SpiraId> {
        self.release_id.as_ref()
    }

    pub fn test_set_id(&self) -> Option<&SpiraId> {
        self.test_set_id.as_ref()
    }

    pub fn completion(&self) -> CompletionMode {
        self.completion
    }

    pub fn flush_timeout(&self) -> Option<Duration> {
        self.flush_timeout
    }

    /// Same configuration with a different completion policy.
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    /// Same configuration with a different flush deadline.
    pub fn with_flush_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.flush_timeout = timeout;
        self
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    errors: &mut Vec<ConfigError>,
) -> Option<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value.is_none() && !reported(errors, field) {
        errors.push(ConfigError::MissingField(field));
    }
    value
}

/// Whether `field` already failed to decode.
fn reported(errors: &[ConfigError], field: &str) -> bool {
    errors
        .iter()
        .any(|err| matches!(err, ConfigError::InvalidField { field: name, .. } if name == field))
}

fn is_blank(id: &SpiraId) -> bool {
    matches!(id, SpiraId::Text(text) if text.trim().is_empty())
}

fn build_test_cases(table: Map<String, Value>, errors: &mut Vec<ConfigError>) -> Option<TestCaseMap> {
    let default = match table.get(DEFAULT_TEST_CASE_KEY) {
        Some(value) => parse_id(DEFAULT_TEST_CASE_KEY, value, errors),
        None => {
            errors.push(ConfigError::MissingDefaultTestCase);
            None
        }
    };

    let mut map = TestCaseMap::new(default.clone().unwrap_or(SpiraId::Number(0)));
    for (title, value) in &table {
        if title == DEFAULT_TEST_CASE_KEY {
            continue;
        }
        if let Some(id) = parse_id(title, value, errors) {
            map.insert(title, id);
        }
    }

    default.map(|_| map)
}

fn parse_id(key: &str, value: &Value, errors: &mut Vec<ConfigError>) -> Option<SpiraId> {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(id) => Some(SpiraId::Number(id)),
            None => {
                errors.push(invalid_test_case(key, format!("`{number}` is not an integer id")));
                None
            }
        },
        Value::String(text) if !text.trim().is_empty() => Some(SpiraId::Text(text.clone())),
        other => {
            errors.push(invalid_test_case(key, format!("expected an id, got `{other}`")));
            None
        }
    }
}

fn invalid_test_case(key: &str, reason: String) -> ConfigError {
    ConfigError::InvalidField {
        field: format!("testCases.{key}"),
        reason,
    }
}
