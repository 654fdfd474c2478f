use crate::infra::{build_engine, sample_jobs, sample_workers, ServiceEngine};
use clap::Args;
use rozgar_match::config::{AppConfig, ConfigError, MatchingConfig};
use rozgar_match::error::AppError;
use rozgar_match::matching::{
    MatchStore, NotificationStore, SchedulerError, SweepReport, SweepTrigger,
};
use rozgar_match::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the admission threshold (0-100) used for the demo sweeps.
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    /// Print the full rendered text of every notification.
    #[arg(long)]
    pub(crate) show_messages: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Jobs CSV export. Falls back to MATCH_JOBS_CSV.
    #[arg(long)]
    pub(crate) jobs: Option<PathBuf>,
    /// Workers CSV export. Falls back to MATCH_WORKERS_CSV.
    #[arg(long)]
    pub(crate) workers: Option<PathBuf>,
    /// Directory holding matches.jsonl and notifications.jsonl. Falls back to MATCH_STORE_DIR;
    /// without either, results are kept in memory and lost on exit.
    #[arg(long)]
    pub(crate) store_dir: Option<PathBuf>,
    /// Print the sweep report as JSON instead of a summary.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let SweepArgs {
        jobs,
        workers,
        store_dir,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let matching = &mut config.matching;
    matching.jobs_csv = jobs.or(matching.jobs_csv.take());
    matching.workers_csv = workers.or(matching.workers_csv.take());
    matching.store_dir = store_dir.or(matching.store_dir.take());
    if matching.jobs_csv.is_none() {
        return Err(missing_source("MATCH_JOBS_CSV"));
    }
    if matching.workers_csv.is_none() {
        return Err(missing_source("MATCH_WORKERS_CSV"));
    }

    let engine = build_engine(matching, false)?;
    let report = tokio::task::spawn_blocking(move || engine.run_sweep(SweepTrigger::Cli))
        .await
        .map_err(|join_error| SchedulerError::Crashed(join_error.to_string()))??;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|error| AppError::Io(std::io::Error::other(error)))?;
        println!("{rendered}");
    } else {
        render_report(&report);
    }
    Ok(())
}

fn missing_source(key: &'static str) -> AppError {
    AppError::Config(ConfigError::InvalidValue {
        key,
        value: String::new(),
    })
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        threshold,
        show_messages,
    } = args;

    let mut config = MatchingConfig::default();
    if let Some(threshold) = threshold {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(AppError::Config(ConfigError::InvalidValue {
                key: "--threshold",
                value: threshold.to_string(),
            }));
        }
        config.admission_threshold = threshold;
    }
    let engine = build_engine(&config, true)?;

    println!("Rozgar Match demo");
    println!(
        "Sample marketplace, admission threshold {:.1}",
        config.admission_threshold
    );

    let first = engine.run_sweep(SweepTrigger::Cli)?;
    println!("\nFirst sweep");
    render_report(&first);

    let second = engine.run_sweep(SweepTrigger::Cli)?;
    println!("\nSecond sweep (existing pairs are skipped)");
    render_report(&second);

    render_matches(&engine)?;
    render_notifications(&engine, show_messages)?;
    Ok(())
}

fn render_report(report: &SweepReport) {
    println!(
        "- sweep #{} ({}) via {} strategy",
        report.sweep_id,
        report.trigger.label(),
        report.strategy
    );
    println!(
        "- {} active jobs x {} workers | {} pairs evaluated",
        report.jobs, report.workers, report.evaluated
    );
    println!(
        "- {} created | {} already matched | {} below threshold",
        report.created, report.skipped_existing, report.below_threshold
    );
    println!(
        "- {} notifications sent | {} notification failures | {} failed pairs",
        report.notifications_sent, report.notification_failures, report.failed_pairs
    );
    if report.rejected_records > 0 {
        println!("- {} malformed records skipped", report.rejected_records);
    }
    if report.aborted {
        println!("- sweep was aborted before finishing");
    }
}

fn render_matches(engine: &ServiceEngine) -> Result<(), AppError> {
    let matches = engine.matches().all()?;
    println!("\nMatches ({})", matches.len());
    for record in matches {
        println!(
            "  - {} -> {} | score {:.1} | {}",
            record.worker_id,
            record.job_id,
            record.score,
            record.status.label()
        );
    }
    for job in sample_jobs() {
        let count = engine.matches().count_for_job(&job.id)?;
        println!("  {} ({}): {} matched workers", job.title, job.id, count);
    }
    Ok(())
}

fn render_notifications(engine: &ServiceEngine, show_messages: bool) -> Result<(), AppError> {
    println!("\nNotifications");
    for worker in sample_workers() {
        let notifications = engine.notifications().for_worker(&worker.id)?;
        println!(
            "  - {} ({}, prefers {}): {} received",
            worker.name,
            worker.id,
            worker.language,
            notifications.len()
        );
        for notification in notifications {
            println!(
                "      [{}] {} via {:?} to {}",
                notification.language,
                notification.job_id,
                notification.channel,
                notification.phone_number
            );
            if show_messages {
                println!("        {}", notification.message);
            }
        }
    }
    Ok(())
}
