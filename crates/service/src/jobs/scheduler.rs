use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use super::{run_job, JobContext, JobKind};

/// One interval loop per job. The first run happens one period after spawn.
pub struct JobScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn spawn(ctx: Arc<JobContext>, cfg: &configs::JobsConfig) -> Self {
        let schedule = [
            (JobKind::DailyReminders, cfg.daily_interval_secs),
            (JobKind::MonthlyReport, cfg.monthly_interval_secs),
            (JobKind::RecomputeRatings, cfg.ratings_interval_secs),
            (JobKind::CleanupOldData, cfg.daily_interval_secs),
        ];
        let handles = schedule
            .into_iter()
            .map(|(kind, secs)| Self::spawn_one(ctx.clone(), kind, Duration::from_secs(secs)))
            .collect();
        Self { handles }
    }

    pub fn spawn_one(ctx: Arc<JobContext>, kind: JobKind, period: Duration) -> JoinHandle<()> {
        info!(job = %kind, ?period, "scheduling job");
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // failures are logged and counted inside run_job
                let _ = run_job(&ctx, kind).await;
            }
        })
    }

    pub fn len(&self) -> usize { self.handles.len() }

    pub fn is_empty(&self) -> bool { self.handles.is_empty() }

    pub fn shutdown(self) {
        for h in self.handles {
            h.abort();
        }
    }
}
