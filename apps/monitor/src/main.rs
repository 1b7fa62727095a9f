// =====================================================================================
// MONITOR - COMMAND LINE ACCESS TO THE MONITORING SERVICE
// =====================================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monitoring_cell::models::{ExportFormat, ExportKind};
use monitoring_cell::MonitoringReportService;
use shared_config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "monitor")]
#[command(about = "Medication reminder self-test and health reporting")]
struct Cli {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Check every registered feature against the frontend and backend
    SyncFeatures,
    /// Probe every registered endpoint test (Ctrl-C cancels)
    RunTests,
    /// Register the default endpoint tests
    SetupTests,
    /// Check components and record a health snapshot
    HealthCheck,
    /// Show the current version and build information
    VersionReport,
    /// Record a new current version for this environment
    CreateVersion {
        #[arg(long = "version-num")]
        version_num: String,

        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Show the monitoring dashboard
    Dashboard,
    /// Show alerts that need attention
    Alerts,
    /// Delete health snapshots older than the retention window
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Write a report to a new file
    ExportReport {
        #[arg(long = "type", default_value = "dashboard")]
        kind: ExportKind,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::from_env());
    let service = MonitoringReportService::new(config)
        .await
        .context("failed to initialise monitoring")?;

    run(&service, cli.action).await
}

async fn run(service: &MonitoringReportService, action: Action) -> anyhow::Result<()> {
    match action {
        Action::SyncFeatures => print_json(&service.sync_features().await?),
        Action::RunTests => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling remaining probes");
                    on_signal.cancel();
                }
            });

            let report = service.run_api_tests(&cancel).await;
            watcher.abort();
            print_json(&report?)
        }
        Action::SetupTests => {
            let count = service.setup_default_tests().await?;
            info!("Registered {} default endpoint tests", count);
            print_json(&serde_json::json!({ "count": count }))
        }
        Action::HealthCheck => print_json(&service.perform_health_check().await?),
        Action::VersionReport => print_json(&service.generate_version_report().await?),
        Action::CreateVersion { version_num, notes } => {
            print_json(&service.create_version(&version_num, &notes).await?)
        }
        Action::Dashboard => print_json(&service.dashboard().await?),
        Action::Alerts => print_json(&service.critical_alerts().await?),
        Action::Cleanup { days } => {
            let removed = service.cleanup_health_history(days).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Action::ExportReport { kind, output, format } => {
            print_json(&service.export_report(kind, format, &output).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_report_arguments() {
        let cli = Cli::try_parse_from([
            "monitor",
            "export-report",
            "--type",
            "api_tests",
            "--output",
            "report.csv",
            "--format",
            "csv",
        ])
        .unwrap();

        match cli.action {
            Action::ExportReport { kind, output, format } => {
                assert_eq!(kind, ExportKind::ApiTests);
                assert_eq!(format, ExportFormat::Csv);
                assert_eq!(output, PathBuf::from("report.csv"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_unknown_export_type_is_rejected() {
        let result = Cli::try_parse_from(["monitor", "export-report", "--type", "everything", "--output", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_version_requires_number() {
        assert!(Cli::try_parse_from(["monitor", "create-version"]).is_err());
    }

    #[tokio::test]
    async fn test_cleanup_rejects_negative_days() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::from_env();
        config.redis_url = None;
        config.monitoring_state_path = None;
        config.frontend_project_root = dir.path().display().to_string();

        let service = MonitoringReportService::new(Arc::new(config)).await.unwrap();
        let result = run(&service, Action::Cleanup { days: -1 }).await;
        assert!(result.is_err());
    }
}
