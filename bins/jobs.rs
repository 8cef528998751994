//! One-shot runner for the background jobs, for cron or manual use:
//! `jobs <daily_reminders|monthly_report|recompute_ratings|cleanup_old_data|all>`.

use std::process::ExitCode;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info};

use service::jobs::{run_job, JobContext, JobKind};
use service::notify::mailer_from_config;

fn parse_kinds(arg: Option<String>) -> anyhow::Result<Vec<JobKind>> {
    match arg.as_deref() {
        None | Some("all") => Ok(JobKind::ALL.to_vec()),
        Some(name) => Ok(vec![name.parse::<JobKind>()?]),
    }
}

async fn run(kinds: Vec<JobKind>) -> anyhow::Result<usize> {
    let cfg = configs::AppConfig::load_and_validate().or_else(|_| configs::AppConfig::from_env())?;
    let db = models::db::connect_with_config(&cfg.database).await?;
    models::db::migrate(&db).await?;
    let mailer = mailer_from_config(&cfg.mail).context("building mailer")?;
    let ctx = JobContext::new(db, mailer, &cfg.jobs);

    let mut failures = 0;
    for kind in kinds {
        match run_job(&ctx, kind).await {
            Ok(report) => info!(job = %kind, processed = report.processed, failed = report.failed, "done"),
            Err(e) => {
                error!(job = %kind, error = %e, "job failed");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

fn main() -> ExitCode {
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let kinds = match parse_kinds(std::env::args().nth(1)) {
        Ok(k) => k,
        Err(e) => {
            error!(error = %e, "usage: jobs <job-name|all>");
            return ExitCode::from(2);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(kinds)) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(n) => {
            error!(failed = n, "some jobs failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "job runner failed to start");
            ExitCode::FAILURE
        }
    }
}
