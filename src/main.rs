use std::process::ExitCode;

use clap::Parser;
use spira_relay::cli::{self, CliConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = CliConfig::parse();
    match cli::run(&cli).await {
        Ok(report) => {
            println!(
                "{} test runs sent: {} recorded, {} rejected, {} undelivered",
                report.submitted,
                report.responded - report.error_statuses,
                report.error_statuses,
                report.transport_failures,
            );
            if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!(%err, "Spira relay failed");
            ExitCode::FAILURE
        }
    }
}
