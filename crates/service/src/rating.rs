//! Reviews and the professional average rating derived from them.
//!
//! [`recompute_average`] is the only place the average is computed. Review
//! creation uses it inside the insert transaction; [`recompute_all`] uses it
//! for the periodic bulk pass.

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use common::metrics::REVIEWS_TOTAL;
use models::errors::ModelError;
use models::{customer, professional, review, service_request};

use crate::errors::ServiceError;

/// Mean of `ratings`, `0.0` when there are none.
pub fn recompute_average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    sum as f64 / ratings.len() as f64
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: i32,
    #[serde(default, alias = "remark")]
    pub comment: String,
}

fn is_unique_violation(e: &ModelError) -> bool {
    match e {
        ModelError::Db(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("unique") || msg.contains("duplicate key")
        }
        _ => false,
    }
}

async fn insert_and_refresh<C: ConnectionTrait>(
    conn: &C,
    request: &service_request::Model,
    input: &ReviewInput,
) -> Result<review::Model, ServiceError> {
    let created = review::create(conn, request.id, input.rating, &input.comment)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("a review already exists for this service request".into())
            } else {
                ServiceError::from(e)
            }
        })?;
    if let Some(professional_id) = request.professional_id {
        let ratings = review::ratings_for_professional(conn, professional_id).await?;
        professional::set_avg_rating(conn, professional_id, recompute_average(&ratings)).await?;
    }
    Ok(created)
}

/// Store a review from the customer behind `user_id` and refresh the
/// professional's average in the same transaction.
#[instrument(skip(db, input), fields(rating = input.rating))]
pub async fn create_review(
    db: &DatabaseConnection,
    user_id: i32,
    request_id: i32,
    input: ReviewInput,
) -> Result<review::Model, ServiceError> {
    let customer = customer::find_by_user(db, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("customer profile"))?;
    let request = service_request::Entity::find_by_id(request_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .filter(|r| r.customer_id == customer.id)
        .ok_or_else(|| ServiceError::not_found("service request"))?;
    if !request.current_status()?.is_finished() {
        return Err(ServiceError::InvalidTransition("only completed or closed requests can be reviewed".into()));
    }
    review::validate(input.rating, &input.comment)?;
    if review::find_by_request(db, request.id).await?.is_some() {
        return Err(ServiceError::Conflict("a review already exists for this service request".into()));
    }

    let txn = db.begin().await.map_err(ServiceError::db)?;
    match insert_and_refresh(&txn, &request, &input).await {
        Ok(created) => {
            txn.commit().await.map_err(ServiceError::db)?;
            REVIEWS_TOTAL.inc();
            info!(review_id = created.id, "review stored");
            Ok(created)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "rollback after failed review");
            }
            Err(e)
        }
    }
}

/// Recompute every professional's average from scratch. Returns how many were updated.
pub async fn recompute_all(db: &DatabaseConnection) -> Result<usize, ServiceError> {
    let professionals = professional::Entity::find().all(db).await.map_err(ServiceError::db)?;
    for p in &professionals {
        let ratings = review::ratings_for_professional(db, p.id).await?;
        professional::set_avg_rating(db, p.id, recompute_average(&ratings)).await?;
    }
    info!(count = professionals.len(), "ratings recomputed");
    Ok(professionals.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::repo::SeaOrmLifecycleRepository;
    use crate::lifecycle::{LifecycleService, Policy};
    use crate::test_support::{add_customer, add_professional, complete_request, new_request, seed, Seed};
    use std::sync::Arc;

    fn input(rating: i32) -> ReviewInput { ReviewInput { rating, comment: "Tidy and on time".into() } }

    async fn avg_of(db: &DatabaseConnection, id: i32) -> f64 {
        professional::Entity::find_by_id(id).one(db).await.unwrap().unwrap().avg_rating
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(recompute_average(&[]), 0.0);
        assert_eq!(recompute_average(&[4]), 4.0);
        assert!((recompute_average(&[5, 4, 4]) - 13.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn remark_is_accepted_for_comment() {
        let parsed: ReviewInput = serde_json::from_str(r#"{"rating": 5, "remark": "great"}"#).unwrap();
        assert_eq!(parsed.comment, "great");
    }

    #[tokio::test]
    async fn incremental_and_bulk_paths_agree() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, .. } = seed().await?;
        for rating in [5, 3, 4, 1] {
            let req = new_request(&db, &customer_user).await?;
            let req = complete_request(&db, &req, professional.id).await?;
            create_review(&db, customer_user.id, req.id, input(rating)).await?;
        }
        let incremental = avg_of(&db, professional.id).await;
        assert!((incremental - 3.25).abs() < 1e-9);

        professional::set_avg_rating(&db, professional.id, 0.0).await?;
        assert_eq!(recompute_all(&db).await?, 1);
        assert!((avg_of(&db, professional.id).await - incremental).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn boundary_ratings_are_accepted_and_outliers_rejected() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, .. } = seed().await?;
        let a = complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;
        let b = complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;

        for bad in [0, 6] {
            let err = create_review(&db, customer_user.id, a.id, input(bad)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Model(ModelError::Validation(_))), "{err:?}");
        }
        let empty = ReviewInput { rating: 3, comment: "  ".into() };
        assert!(matches!(
            create_review(&db, customer_user.id, a.id, empty).await,
            Err(ServiceError::Model(ModelError::Validation(_)))
        ));

        create_review(&db, customer_user.id, a.id, input(1)).await?;
        create_review(&db, customer_user.id, b.id, input(5)).await?;
        assert!((avg_of(&db, professional.id).await - 3.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn second_review_conflicts() -> anyhow::Result<()> {
        let Seed { db, customer_user, professional, .. } = seed().await?;
        let req = complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;
        create_review(&db, customer_user.id, req.id, input(4)).await?;
        let err = create_review(&db, customer_user.id, req.id, input(2)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!((avg_of(&db, professional.id).await - 4.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn unfinished_or_foreign_requests_cannot_be_reviewed() -> anyhow::Result<()> {
        let Seed { db, customer_user, .. } = seed().await?;
        let open = new_request(&db, &customer_user).await?;
        assert!(matches!(
            create_review(&db, customer_user.id, open.id, input(4)).await,
            Err(ServiceError::InvalidTransition(_))
        ));

        let (stranger, _) = add_customer(&db, "cust_two").await?;
        assert!(matches!(
            create_review(&db, stranger.id, open.id, input(4)).await,
            Err(ServiceError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reject_after_review_moves_the_rating_off_the_professional() -> anyhow::Result<()> {
        let Seed { db, service, customer_user, professional, .. } = seed().await?;
        let (rival_user, rival) = add_professional(&db, "pro_two", service.id, true).await?;
        let svc = LifecycleService::new(Arc::new(SeaOrmLifecycleRepository::new(db.clone())), Policy::default());

        let req = complete_request(&db, &new_request(&db, &customer_user).await?, professional.id).await?;
        create_review(&db, customer_user.id, req.id, input(5)).await?;
        assert!((avg_of(&db, professional.id).await - 5.0).abs() < 1e-9);

        let rejected = svc.reject(rival_user.id, req.id).await?;
        assert!(rejected.professional_id.is_none());
        let stored = avg_of(&db, professional.id).await;
        let bulk = recompute_average(&review::ratings_for_professional(&db, professional.id).await?);
        assert_eq!(stored, bulk);
        assert_eq!(stored, 0.0);

        svc.accept(rival_user.id, req.id).await?;
        let stored = avg_of(&db, rival.id).await;
        assert_eq!(stored, recompute_average(&review::ratings_for_professional(&db, rival.id).await?));
        assert!((stored - 5.0).abs() < 1e-9);
        Ok(())
    }
}
