use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::http::{SubmitOutcome, build_client, submit_record};
use crate::record::TestRunRecord;

/// When a flush counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// Finished once every request has settled, delivered or not.
    #[default]
    Settled,
    /// Finished only once every request got a response. A single transport
    /// failure keeps the flush pending until `flushTimeoutMs`, or forever.
    /// A timed-out flush keeps its records, so the next flush posts them
    /// again, including any Spira already recorded.
    Legacy,
}

/// Tally of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub submitted: usize,
    pub responded: usize,
    pub transport_failures: usize,
    /// Responses with a 4xx/5xx status. These still count as responded.
    pub error_statuses: usize,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.responded == self.submitted
    }
}

#[derive(Default)]
struct Tally {
    responded: AtomicUsize,
    transport_failures: AtomicUsize,
    error_statuses: AtomicUsize,
}

impl Tally {
    fn record(&self, outcome: &SubmitOutcome) {
        if outcome.is_response() {
            self.responded.fetch_add(1, Ordering::SeqCst);
            if outcome.is_error_status() {
                self.error_statuses.fetch_add(1, Ordering::SeqCst);
            }
        } else {
            self.transport_failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn report(&self, submitted: usize) -> FlushReport {
        FlushReport {
            submitted,
            responded: self.responded.load(Ordering::SeqCst),
            transport_failures: self.transport_failures.load(Ordering::SeqCst),
            error_statuses: self.error_statuses.load(Ordering::SeqCst),
        }
    }
}

/// Post every record of `batch` concurrently and wait according to the
/// configured [`CompletionMode`]. When the deadline passes, requests still
/// in flight are aborted.
pub async fn flush_batch(config: &RelayConfig, batch: &[TestRunRecord]) -> RelayResult<FlushReport> {
    let submitted = batch.len();
    if submitted == 0 {
        debug!("no test runs to send");
        return Ok(FlushReport::default());
    }

    let endpoint = Arc::new(config.endpoint().clone());
    let client = build_client()?;
    let tally = Arc::new(Tally::default());

    info!(
        records = submitted,
        transport = %endpoint.transport(),
        endpoint = %endpoint.redacted(),
        "sending test runs to Spira"
    );

    let mut handles = Vec::with_capacity(submitted);
    for record in batch.iter().cloned() {
        let client = client.clone();
        let endpoint = endpoint.clone();
        let tally = tally.clone();

        handles.push(tokio::spawn(async move {
            let outcome = submit_record(&client, &endpoint, &record).await;
            tally.record(&outcome);
        }));
    }

    let aborts: Vec<AbortHandle> = handles.iter().map(JoinHandle::abort_handle).collect();
    let completion = config.completion();
    let settle = {
        let tally = tally.clone();
        async move {
            for handle in handles {
                handle.await.map_err(|err| RelayError::Task {
                    message: err.to_string(),
                })?;
            }

            let report = tally.report(submitted);
            if completion == CompletionMode::Legacy && !report.is_complete() {
                warn!(
                    responded = report.responded,
                    submitted,
                    "flush cannot complete: some test runs never got a response"
                );
                std::future::pending::<()>().await;
            }
            Ok::<_, RelayError>(report)
        }
    };

    let report = match config.flush_timeout() {
        Some(timeout) => match tokio::time::timeout(timeout, settle).await {
            Ok(result) => result?,
            Err(_) => {
                for abort in &aborts {
                    abort.abort();
                }
                let report = tally.report(submitted);
                return Err(RelayError::FlushTimedOut {
                    timeout_ms: timeout.as_millis() as u64,
                    submitted,
                    responded: report.responded,
                });
            }
        },
        None => settle.await?,
    };

    info!(
        submitted = report.submitted,
        responded = report.responded,
        transport_failures = report.transport_failures,
        error_statuses = report.error_statuses,
        "test runs sent"
    );
    Ok(report)
}
