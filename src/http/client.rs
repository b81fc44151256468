use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};
use crate::record::TestRunRecord;

use super::request::Endpoint;
use super::response::SubmitOutcome;

const JSON: &str = "application/json";

/// Client used for one flush. Idle connections are not kept, so every record
/// goes out on its own connection.
pub fn build_client() -> RelayResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));

    Client::builder()
        .default_headers(headers)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|err| RelayError::Client {
            message: err.to_string(),
        })
}

/// POST one record. Never fails: transport problems come back as
/// [`SubmitOutcome::TransportFailed`].
pub async fn submit_record(
    client: &Client,
    endpoint: &Endpoint,
    record: &TestRunRecord,
) -> SubmitOutcome {
    let body = match serde_json::to_vec(record) {
        Ok(body) => body,
        Err(err) => {
            return SubmitOutcome::TransportFailed {
                message: format!("Failed to encode record: {err}"),
            };
        }
    };

    let response = match client.post(endpoint.url().clone()).body(body).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(
                test = %record.runner_test_name,
                error = %err,
                "test run not delivered to Spira"
            );
            return SubmitOutcome::TransportFailed {
                message: format!("Request failed: {err}"),
            };
        }
    };

    let status = response.status();
    let body_bytes = match response.bytes().await {
        Ok(bytes) => bytes.len(),
        Err(err) => {
            debug!(status = status.as_u16(), error = %err, "failed to read Spira response body");
            0
        }
    };

    if status.is_client_error() || status.is_server_error() {
        warn!(
            test = %record.runner_test_name,
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or("Unknown"),
            "Spira rejected test run"
        );
    } else {
        debug!(
            test = %record.runner_test_name,
            status = status.as_u16(),
            body_bytes,
            "test run recorded"
        );
    }

    SubmitOutcome::Responded {
        status: status.as_u16(),
        body_bytes,
    }
}
