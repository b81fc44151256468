//! Integration tests for flushing test runs to Spira.
//!
//! Uses wiremock in place of the Spira REST service.

use std::time::Duration;

use serde_json::{Value, json};
use spira_relay::{RelayError, ResultRelay, SuiteResult, TestResult};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORD_PATH: &str = "/acme/Services/v5_0/RestService.svc/projects/7/test-runs/record";

/// Nothing listens here, so connections are refused.
const DEAD_URL: &str = "http://127.0.0.1:1";

fn options(url: &str) -> Value {
    json!({
        "url": url,
        "username": "u",
        "token": "t",
        "projectId": "7",
        "testCases": { "default": 100, "Adds correctly": 200 }
    })
}

fn calculator_suite() -> SuiteResult {
    SuiteResult::new(vec![
        TestResult::new("Stores correctly", "passed"),
        TestResult::new("Adds correctly", "passed"),
        TestResult::new("Multiplies correctly", "failed").with_failure("expected 11 got 12"),
        TestResult::new("Exponents work correctly", "pending"),
    ])
}

async fn mount_record_route(server: &MockServer, status: u16, expected: u64) {
    Mock::given(method("POST"))
        .and(path(RECORD_PATH))
        .and(query_param("username", "u"))
        .and(query_param("api-key", "t"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(status).set_body_string("{\"TestRunId\": 1}"))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn posts_one_record_per_result() {
    let server = MockServer::start().await;
    mount_record_route(&server, 200, 4).await;

    let mut relay = ResultRelay::new(&Value::Null, options(&format!("{}/acme/", server.uri())));
    relay.on_test_result(&calculator_suite());
    let report = relay.on_run_complete().await.expect("flush failed");

    assert_eq!(report.submitted, 4);
    assert_eq!(report.responded, 4);
    assert_eq!(report.transport_failures, 0);
    assert!(report.is_complete());
    assert!(relay.pending().is_empty());

    let requests = server.received_requests().await.expect("recording enabled");
    let mut bodies: Vec<Value> = requests
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();
    bodies.sort_by_key(|body| body["RunnerTestName"].as_str().unwrap().to_string());

    assert_eq!(bodies[0]["RunnerTestName"], "Adds correctly");
    assert_eq!(bodies[0]["TestCaseId"], 200);
    assert_eq!(bodies[0]["ExecutionStatusId"], 2);
    assert_eq!(bodies[0]["RunnerMessage"], "Test Succeeded");
    assert_eq!(bodies[0]["RunnerStackTrace"], "");
    assert_eq!(bodies[0]["RunnerName"], "JestJS");

    assert_eq!(bodies[1]["RunnerTestName"], "Exponents work correctly");
    assert_eq!(bodies[1]["ExecutionStatusId"], 3);

    assert_eq!(bodies[2]["RunnerTestName"], "Multiplies correctly");
    assert_eq!(bodies[2]["TestCaseId"], 100);
    assert_eq!(bodies[2]["ExecutionStatusId"], 1);
    assert_eq!(bodies[2]["RunnerStackTrace"], "expected 11 got 12\n");

    for body in &bodies {
        let date = body["StartDate"].as_str().unwrap();
        assert!(date.starts_with("/Date(") && date.ends_with("-0000)/"), "{date}");
        assert!(body.get("ReleaseId").is_none());
        assert!(body.get("TestSetId").is_none());
    }
}

#[tokio::test]
async fn optional_ids_reach_spira() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "ReleaseId": 5, "TestSetId": 9 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = options(&server.uri());
    options["releaseId"] = json!(5);
    options["testSetId"] = json!(9);
    let mut relay = ResultRelay::new(&Value::Null, options);
    relay.on_test_result(&SuiteResult::new(vec![TestResult::new("Adds correctly", "passed")]));

    let report = relay.on_run_complete().await.expect("flush failed");
    assert_eq!(report.responded, 1);
}

#[tokio::test]
async fn error_statuses_still_complete_the_flush() {
    let server = MockServer::start().await;
    mount_record_route(&server, 500, 4).await;

    let mut relay = ResultRelay::new(&Value::Null, options(&format!("{}/acme", server.uri())));
    relay.on_test_result(&calculator_suite());
    let report = relay.on_run_complete().await.expect("flush failed");

    assert_eq!(report.responded, 4);
    assert_eq!(report.error_statuses, 4);
    assert!(report.is_complete());
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn missing_project_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = options(&server.uri());
    options.as_object_mut().unwrap().remove("projectId");
    let mut relay = ResultRelay::new(&Value::Null, options);
    relay.on_test_result(&calculator_suite());

    let report = relay.on_run_complete().await.expect("disabled flush never fails");
    assert_eq!(report.submitted, 0);
    assert!(!relay.is_enabled());
}

#[tokio::test]
async fn settled_mode_finishes_despite_refused_connections() {
    let mut relay = ResultRelay::new(&Value::Null, options(DEAD_URL));
    relay.on_test_result(&calculator_suite());

    let report = relay.on_run_complete().await.expect("flush failed");
    assert_eq!(report.submitted, 4);
    assert_eq!(report.responded, 0);
    assert_eq!(report.transport_failures, 4);
    assert!(!report.is_complete());
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn legacy_mode_stalls_on_refused_connections() {
    let mut options = options(DEAD_URL);
    options["completion"] = json!("legacy");
    options["flushTimeoutMs"] = json!(300);
    let mut relay = ResultRelay::new(&Value::Null, options);
    relay.on_test_result(&calculator_suite());

    let err = relay.on_run_complete().await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::FlushTimedOut {
            timeout_ms: 300,
            submitted: 4,
            responded: 0,
        }
    ));
    assert_eq!(relay.pending().len(), 4, "a stalled flush keeps its records");
}

#[tokio::test]
async fn slow_service_times_out_and_keeps_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut options = options(&server.uri());
    options["flushTimeoutMs"] = json!(200);
    let mut relay = ResultRelay::new(&Value::Null, options);
    relay.on_test_result(&calculator_suite());

    let started = std::time::Instant::now();
    let err = relay.on_run_complete().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        err,
        RelayError::FlushTimedOut {
            submitted: 4,
            responded: 0,
            ..
        }
    ));
    assert_eq!(relay.pending().len(), 4);
}

#[tokio::test]
async fn unusable_url_never_reaches_the_flush() {
    let mut options = options("ftp://x.example");
    options["completion"] = json!("legacy");
    let mut relay = ResultRelay::new(&Value::Null, options);
    assert!(!relay.is_enabled());

    relay.on_test_result(&calculator_suite());
    let report = relay.on_run_complete().await.expect("disabled flush never fails");
    assert_eq!(report.submitted, 0);
}

#[tokio::test]
async fn legacy_mode_completes_when_every_record_is_answered() {
    let server = MockServer::start().await;
    mount_record_route(&server, 201, 4).await;

    let mut options = options(&format!("{}/acme", server.uri()));
    options["completion"] = json!("legacy");
    let mut relay = ResultRelay::new(&Value::Null, options);
    relay.on_test_result(&calculator_suite());

    let report = relay.on_run_complete().await.expect("flush failed");
    assert!(report.is_complete());
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn later_results_go_out_with_the_next_flush() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut relay = ResultRelay::new(&Value::Null, options(&server.uri()));
    relay.on_test_result(&calculator_suite());
    assert_eq!(relay.on_run_complete().await.unwrap().submitted, 4);

    relay.on_test_result(&SuiteResult::new(vec![TestResult::new("Adds correctly", "passed")]));
    let report = relay.on_run_complete().await.unwrap();
    assert_eq!(report.submitted, 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
}
