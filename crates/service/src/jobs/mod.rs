//! Periodic background work: reminders, monthly reports, rating refresh and
//! data retention. Jobs only run when a [`scheduler::JobScheduler`] is
//! spawned or a job is invoked explicitly.

pub mod retry;
pub mod scheduler;
pub mod tasks;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{error, info};

use common::metrics::JOB_RUNS_TOTAL;

use crate::cache::ResponseCache;
use crate::errors::ServiceError;
use crate::notify::Mailer;
use retry::{retry_with_policy, RetryPolicy};

pub struct JobContext {
    pub db: DatabaseConnection,
    pub mailer: Arc<dyn Mailer>,
    pub retry: RetryPolicy,
    pub retention_days: i64,
    /// Emptied after a job rewrites rows that cached listings were built from.
    pub cache: Option<ResponseCache>,
}

impl JobContext {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, cfg: &configs::JobsConfig) -> Self {
        Self { db, mailer, retry: RetryPolicy::from_config(cfg), retention_days: cfg.retention_days, cache: None }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Recipients already served during one job run. Attempts after a failed
/// one skip them, so a retry never sends the same email twice.
#[derive(Debug, Default)]
pub struct Delivered(Mutex<HashSet<String>>);

impl Delivered {
    pub fn contains(&self, to: &str) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).contains(to)
    }

    pub fn record(&self, to: &str) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).insert(to.to_string());
    }

    pub fn len(&self) -> usize { self.0.lock().unwrap_or_else(|e| e.into_inner()).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl JobReport {
    pub fn new(job: &'static str) -> Self { Self { job, ..Self::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DailyReminders,
    MonthlyReport,
    RecomputeRatings,
    CleanupOldData,
}

impl JobKind {
    pub const ALL: [JobKind; 4] =
        [JobKind::DailyReminders, JobKind::MonthlyReport, JobKind::RecomputeRatings, JobKind::CleanupOldData];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DailyReminders => "daily_reminders",
            JobKind::MonthlyReport => "monthly_report",
            JobKind::RecomputeRatings => "recompute_ratings",
            JobKind::CleanupOldData => "cleanup_old_data",
        }
    }

    /// Jobs that rewrite requests, reviews or averages.
    pub fn changes_data(&self) -> bool { matches!(self, JobKind::RecomputeRatings | JobKind::CleanupOldData) }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for JobKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim().replace('-', "_"))
            .ok_or_else(|| ServiceError::Validation(format!("unknown job: {s}")))
    }
}

async fn run_once(
    ctx: &JobContext,
    kind: JobKind,
    customer_ids: Option<Vec<i32>>,
    delivered: &Delivered,
) -> Result<JobReport, ServiceError> {
    match kind {
        JobKind::DailyReminders => tasks::daily_reminders(ctx, delivered).await,
        JobKind::MonthlyReport => tasks::monthly_report(ctx, customer_ids, Utc::now(), delivered).await,
        JobKind::RecomputeRatings => tasks::recompute_ratings(ctx).await,
        JobKind::CleanupOldData => tasks::cleanup_old_data(ctx, Utc::now()).await,
    }
}

/// Run `kind` under the context's retry policy and record the outcome.
pub async fn run_job(ctx: &JobContext, kind: JobKind) -> Result<JobReport, ServiceError> {
    run_job_for(ctx, kind, None).await
}

/// As [`run_job`]; `customer_ids` narrows the monthly report.
pub async fn run_job_for(ctx: &JobContext, kind: JobKind, customer_ids: Option<Vec<i32>>) -> Result<JobReport, ServiceError> {
    let delivered = Delivered::default();
    let res = retry_with_policy(&ctx.retry, || run_once(ctx, kind, customer_ids.clone(), &delivered)).await;
    match &res {
        Ok(report) => {
            if kind.changes_data() {
                if let Some(cache) = &ctx.cache {
                    cache.invalidate_all();
                }
            }
            JOB_RUNS_TOTAL.with_label_values(&[kind.as_str(), "ok"]).inc();
            info!(job = %kind, processed = report.processed, failed = report.failed, skipped = report.skipped, "job finished");
        }
        Err(e) => {
            JOB_RUNS_TOTAL.with_label_values(&[kind.as_str(), "error"]).inc();
            error!(job = %kind, error = %e, "job failed");
        }
    }
    res
}
