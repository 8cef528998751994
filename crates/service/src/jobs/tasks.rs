use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use tracing::{debug, info, warn};

use models::{customer, professional, review, service_request, user, RequestStatus};

use super::{Delivered, JobContext, JobReport};
use crate::errors::ServiceError;
use crate::notify::{deliver, Email};
use crate::rating;

/// `[first day of last month, first day of this month)` plus a "Month YYYY" label.
pub fn previous_month(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, String) {
    let this_month = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let (y, m) = if now.month() == 1 { (now.year() - 1, 12) } else { (now.year(), now.month() - 1) };
    let last_month = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single().unwrap_or(this_month);
    (last_month, this_month, last_month.format("%B %Y").to_string())
}

fn ts(t: DateTime<Utc>) -> DateTime<FixedOffset> { t.into() }

fn aliases(statuses: &[RequestStatus]) -> Vec<&'static str> {
    statuses.iter().flat_map(|s| s.stored_aliases().iter().copied()).collect()
}

/// Send `email` unless an earlier attempt of this run already did.
async fn send_once(ctx: &JobContext, delivered: &Delivered, email: &Email, report: &mut JobReport) -> bool {
    if delivered.contains(&email.to) {
        debug!(to = %email.to, "already delivered in this run");
        report.processed += 1;
        return true;
    }
    match deliver(ctx.mailer.as_ref(), email).await {
        Ok(()) => {
            delivered.record(&email.to);
            report.processed += 1;
            true
        }
        Err(e) => {
            warn!(to = %email.to, error = %e, "email not delivered");
            report.failed += 1;
            false
        }
    }
}

/// Remind every professional with accepted or in-progress work.
pub async fn daily_reminders(ctx: &JobContext, delivered: &Delivered) -> Result<JobReport, ServiceError> {
    let mut report = JobReport::new("daily_reminders");
    let open: Vec<i32> = service_request::Entity::find()
        .select_only()
        .column(service_request::Column::ProfessionalId)
        .filter(service_request::Column::Status.is_in(aliases(&[RequestStatus::Accepted, RequestStatus::InProgress])))
        .filter(service_request::Column::ProfessionalId.is_not_null())
        .into_tuple::<Option<i32>>()
        .all(&ctx.db)
        .await
        .map_err(ServiceError::db)?
        .into_iter()
        .flatten()
        .collect();
    let mut per_professional: BTreeMap<i32, usize> = BTreeMap::new();
    for id in open {
        *per_professional.entry(id).or_default() += 1;
    }
    info!(professionals = per_professional.len(), "sending daily reminders");

    for (professional_id, count) in per_professional {
        let Some((_, Some(owner))) = professional::Entity::find_by_id(professional_id)
            .find_also_related(user::Entity)
            .one(&ctx.db)
            .await
            .map_err(ServiceError::db)?
        else {
            report.skipped += 1;
            continue;
        };
        let email = Email {
            to: owner.email.clone(),
            subject: "You have pending service requests".into(),
            body: format!("Hello {}, you have {count} service request(s) waiting for you.", owner.full_name),
        };
        if !send_once(ctx, delivered, &email, &mut report).await {
            warn!(professional_id, "reminder not delivered");
        }
    }
    Ok(report)
}

struct MonthlyActivity {
    total: usize,
    by_status: BTreeMap<&'static str, usize>,
    avg_rating: f64,
}

fn render_monthly(name: &str, month: &str, activity: &MonthlyActivity) -> String {
    let mut body = format!("Hello {name},\n\nYour activity for {month}:\nTotal requests: {}\n", activity.total);
    for (status, n) in &activity.by_status {
        body.push_str(&format!("  {status}: {n}\n"));
    }
    body.push_str(&format!("Average rating given: {:.1}\n", activity.avg_rating));
    body
}

/// Activity summary for the previous calendar month. Customers without
/// requests in that month are skipped. `customer_ids` narrows the audience.
pub async fn monthly_report(
    ctx: &JobContext,
    customer_ids: Option<Vec<i32>>,
    now: DateTime<Utc>,
    delivered: &Delivered,
) -> Result<JobReport, ServiceError> {
    let mut report = JobReport::new("monthly_report");
    let (start, end, month) = previous_month(now);
    let mut query = customer::Entity::find().find_also_related(user::Entity);
    if let Some(ids) = customer_ids {
        query = query.filter(customer::Column::Id.is_in(ids));
    }
    let customers = query.all(&ctx.db).await.map_err(ServiceError::db)?;
    info!(customers = customers.len(), %month, "building monthly reports");

    for (c, owner) in customers {
        let Some(owner) = owner.filter(|u| !u.email.is_empty()) else {
            warn!(customer_id = c.id, "skipping customer without email");
            report.skipped += 1;
            continue;
        };
        let requests = service_request::Entity::find()
            .filter(service_request::Column::CustomerId.eq(c.id))
            .filter(service_request::Column::DateOfRequest.gte(ts(start)))
            .filter(service_request::Column::DateOfRequest.lt(ts(end)))
            .all(&ctx.db)
            .await
            .map_err(ServiceError::db)?;
        if requests.is_empty() {
            debug!(customer_id = c.id, %month, "no activity");
            report.skipped += 1;
            continue;
        }
        let mut by_status = BTreeMap::new();
        for r in &requests {
            let label = r.current_status().map(|s| s.as_str()).unwrap_or("unknown");
            *by_status.entry(label).or_default() += 1;
        }
        let ratings: Vec<i32> = review::Entity::find()
            .find_also_related(service_request::Entity)
            .filter(service_request::Column::CustomerId.eq(c.id))
            .filter(review::Column::CreatedAt.gte(ts(start)))
            .filter(review::Column::CreatedAt.lt(ts(end)))
            .all(&ctx.db)
            .await
            .map_err(ServiceError::db)?
            .into_iter()
            .map(|(r, _)| r.rating)
            .collect();
        let activity = MonthlyActivity { total: requests.len(), by_status, avg_rating: rating::recompute_average(&ratings) };

        let email = Email {
            to: owner.email.clone(),
            subject: format!("Monthly Activity Report - {month}"),
            body: render_monthly(&owner.full_name, &month, &activity),
        };
        if !send_once(ctx, delivered, &email, &mut report).await {
            warn!(customer_id = c.id, "monthly report not delivered");
        }
    }
    Ok(report)
}

pub async fn recompute_ratings(ctx: &JobContext) -> Result<JobReport, ServiceError> {
    let mut report = JobReport::new("recompute_ratings");
    report.processed = rating::recompute_all(&ctx.db).await?;
    Ok(report)
}

/// Delete finished requests and reviews older than the retention window,
/// then refresh averages so they match the remaining reviews.
pub async fn cleanup_old_data(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, ServiceError> {
    let mut report = JobReport::new("cleanup_old_data");
    let cutoff = ts(now - Duration::days(ctx.retention_days));

    let reviews = review::Entity::delete_many()
        .filter(review::Column::CreatedAt.lt(cutoff))
        .exec(&ctx.db)
        .await
        .map_err(ServiceError::db)?
        .rows_affected;
    let requests = service_request::Entity::delete_many()
        .filter(service_request::Column::DateOfRequest.lt(cutoff))
        .filter(service_request::Column::Status.is_in(aliases(&[RequestStatus::Completed, RequestStatus::Closed])))
        .exec(&ctx.db)
        .await
        .map_err(ServiceError::db)?
        .rows_affected;
    info!(reviews, requests, "old data removed");

    if reviews + requests > 0 {
        rating::recompute_all(&ctx.db).await?;
    }
    report.processed = (reviews + requests) as usize;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::retry::RetryPolicy;
    use crate::notify::mock::RecordingMailer;
    use crate::test_support::{add_customer, complete_request, new_request, seed, Seed};
    use chrono::NaiveDate;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
    use std::sync::Arc;

    fn ctx(db: &DatabaseConnection, mailer: Arc<RecordingMailer>) -> JobContext {
        JobContext { db: db.clone(), mailer, retry: RetryPolicy::none(), retention_days: 365, cache: None }
    }

    async fn backdate(db: &DatabaseConnection, req: service_request::Model, at: DateTime<Utc>) -> anyhow::Result<service_request::Model> {
        let mut am: service_request::ActiveModel = req.into();
        am.date_of_request = Set(at.into());
        Ok(am.update(db).await?)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    #[test]
    fn previous_month_wraps_the_year() {
        let (start, end, label) = previous_month(utc(2024, 1, 15));
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(label, "December 2023");

        let (start, _, label) = previous_month(utc(2024, 3, 31));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(label, "February 2024");
    }

    #[tokio::test]
    async fn reminders_go_to_professionals_with_open_work() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, pro_user, .. } = seed().await?;
        let req = new_request(&db, &customer_user).await?;
        let patch = service_request::RequestPatch {
            status: Some(RequestStatus::Accepted),
            professional_id: Some(Some(professional.id)),
            ..Default::default()
        };
        service_request::update_if_version(&db, req.id, 0, &patch).await?;
        // finished work does not count
        complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;

        let mailer = Arc::new(RecordingMailer::default());
        let report = daily_reminders(&ctx(&db, mailer.clone()), &Delivered::default()).await?;
        assert_eq!(report.processed, 1);
        let sent = mailer.sent();
        assert_eq!(sent[0].to, pro_user.email);
        assert!(sent[0].body.contains("1 service request"));
        Ok(())
    }

    #[tokio::test]
    async fn monthly_report_covers_last_month_and_skips_idle_customers() -> anyhow::Result<()> {
        let Seed { db, customer_user, .. } = seed().await?;
        let (idle, _) = add_customer(&db, "cust_idle").await?;
        let now = utc(2024, 5, 10);
        backdate(&db, new_request(&db, &customer_user).await?, utc(2024, 4, 3)).await?;
        backdate(&db, new_request(&db, &customer_user).await?, utc(2024, 4, 28)).await?;
        backdate(&db, new_request(&db, &customer_user).await?, utc(2024, 5, 2)).await?;
        backdate(&db, new_request(&db, &idle).await?, utc(2024, 3, 30)).await?;

        let mailer = Arc::new(RecordingMailer::default());
        let report = monthly_report(&ctx(&db, mailer.clone()), None, now, &Delivered::default()).await?;
        assert_eq!((report.processed, report.skipped, report.failed), (1, 1, 0));
        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Monthly Activity Report - April 2024");
        assert!(sent[0].body.contains("Total requests: 2"));
        assert!(sent[0].body.contains("requested: 2"));
        Ok(())
    }

    #[tokio::test]
    async fn delivery_failures_are_counted_not_fatal() -> anyhow::Result<()> {
        let Seed { db, customer_user, customer, .. } = seed().await?;
        let (other_user, other) = add_customer(&db, "cust_two").await?;
        let now = utc(2024, 5, 10);
        backdate(&db, new_request(&db, &customer_user).await?, utc(2024, 4, 3)).await?;
        backdate(&db, new_request(&db, &other_user).await?, utc(2024, 4, 4)).await?;

        let mailer = Arc::new(RecordingMailer::default());
        mailer.fail_for(&customer_user.email);
        let report = monthly_report(&ctx(&db, mailer.clone()), None, now, &Delivered::default()).await?;
        assert_eq!((report.processed, report.failed), (1, 1));

        let only = monthly_report(&ctx(&db, mailer.clone()), Some(vec![other.id]), now, &Delivered::default()).await?;
        assert_eq!(only.processed, 1);
        assert_ne!(other.id, customer.id);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_attempt_in_one_run_does_not_resend() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, .. } = seed().await?;
        let (other_user, _) = add_customer(&db, "cust_two").await?;
        let now = utc(2024, 5, 10);
        backdate(&db, new_request(&db, &customer_user).await?, utc(2024, 4, 3)).await?;
        backdate(&db, new_request(&db, &other_user).await?, utc(2024, 4, 4)).await?;
        let req = new_request(&db, &customer_user).await?;
        let accept = service_request::RequestPatch {
            status: Some(RequestStatus::Accepted),
            professional_id: Some(Some(professional.id)),
            ..Default::default()
        };
        service_request::update_if_version(&db, req.id, 0, &accept).await?;

        let mailer = Arc::new(RecordingMailer::default());
        mailer.fail_for(&other_user.email);
        let ctx = ctx(&db, mailer.clone());
        let delivered = Delivered::default();

        let first = monthly_report(&ctx, None, now, &delivered).await?;
        assert_eq!((first.processed, first.failed), (1, 1));
        // same run retried: the served customer is not mailed again
        let second = monthly_report(&ctx, None, now, &delivered).await?;
        assert_eq!((second.processed, second.failed), (1, 1));
        let reports: Vec<_> = mailer.sent().into_iter().filter(|e| e.subject.starts_with("Monthly")).collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].to, customer_user.email);

        let reminders = Delivered::default();
        daily_reminders(&ctx, &reminders).await?;
        daily_reminders(&ctx, &reminders).await?;
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(reminders.len(), 1);

        // a fresh run sends again
        daily_reminders(&ctx, &Delivered::default()).await?;
        assert_eq!(mailer.sent().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn cleanup_removes_old_finished_requests_only() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, .. } = seed().await?;
        let now = Utc::now();
        let old_done = complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;
        backdate(&db, old_done, now - Duration::days(400)).await?;
        let old_open = new_request(&db, &customer_user).await?;
        backdate(&db, old_open, now - Duration::days(400)).await?;
        complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;

        let mailer = Arc::new(RecordingMailer::default());
        let report = cleanup_old_data(&ctx(&db, mailer), now).await?;
        assert_eq!(report.processed, 1);
        assert_eq!(service_request::Entity::find().all(&db).await?.len(), 2);
        Ok(())
    }
}
