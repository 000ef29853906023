//! prharvest CLI entrypoint: fetches pull request history for one
//! repository and prints a summary.

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use prharvest::{
    AbortSignal, CheckpointStore, CredentialPool, FetchReport, HarvestConfig, HarvestContext,
    IntakeError, JobStatus, NoopTelemetrySink, OctocrabGateway, RepositoryLocator,
    SnapshotStore, StderrJsonlTelemetrySink, SyncCoordinator, TelemetrySink,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), IntakeError> {
    let config = load_config()?;

    let locator = config.repository_locator()?;
    let since_date = config.since_date()?;
    let settings = config.harvest_settings()?;
    let pool = CredentialPool::new(config.resolve_tokens()?)?;

    let gateway = OctocrabGateway::new(&locator);
    let checkpoints = CheckpointStore::new(config.checkpoint_dir.as_str());
    let snapshots = SnapshotStore::new(config.cache_dir.as_str());
    let telemetry: Box<dyn TelemetrySink> = if config.telemetry {
        Box::new(StderrJsonlTelemetrySink)
    } else {
        Box::new(NoopTelemetrySink)
    };

    let abort = AbortSignal::new();
    watch_for_interrupt(abort.clone());

    let context = HarvestContext::new(&gateway, &pool, &checkpoints, &settings)
        .with_telemetry(telemetry.as_ref())
        .with_abort_signal(abort);
    let coordinator = SyncCoordinator::new(&context, &snapshots);
    let report = coordinator
        .fetch(&locator, since_date, config.max_items)
        .await?;

    write_summary(&locator, &report)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<HarvestConfig, IntakeError> {
    HarvestConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}

/// Requests a graceful stop on Ctrl-C; the running job saves its checkpoint.
fn watch_for_interrupt(abort: AbortSignal) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; stopping after the current call");
                abort.abort();
            }
            Err(error) => warn!(%error, "failed to listen for interrupts"),
        }
    });
}

fn write_summary(locator: &RepositoryLocator, report: &FetchReport) -> Result<(), IntakeError> {
    let mut stdout = io::stdout().lock();
    let mut message = format!(
        "{}: {} pull requests ({})",
        locator.full_name(),
        report.records.len(),
        report.status.label()
    );
    if let JobStatus::CredentialsExhausted {
        earliest_reset: Some(reset),
    } = &report.status
    {
        message.push_str(&format!("\nQuota resets at {}", reset.to_rfc3339()));
    }
    if let Some(newest) = report.records.first() {
        message.push_str(&format!(
            "\nMost recent: #{} updated {}",
            newest.number,
            newest.updated_at.to_rfc3339()
        ));
    }

    writeln!(stdout, "{message}").map_err(|error| IntakeError::Io {
        message: error.to_string(),
    })
}
