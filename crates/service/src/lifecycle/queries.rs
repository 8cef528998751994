use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select};

use models::{customer, professional, service_request, RequestStatus};

use crate::errors::ServiceError;

fn with_status(query: Select<service_request::Entity>, status: Option<RequestStatus>) -> Select<service_request::Entity> {
    match status {
        Some(s) => query.filter(service_request::Column::Status.is_in(s.stored_aliases().iter().copied())),
        None => query,
    }
}

pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<RequestStatus>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse::<RequestStatus>()?)),
        None => Ok(None),
    }
}

/// Requests owned by the customer behind `user_id`, newest first.
pub async fn list_for_customer(
    db: &DatabaseConnection,
    user_id: i32,
    status: Option<RequestStatus>,
) -> Result<Vec<service_request::Model>, ServiceError> {
    let customer = customer::find_by_user(db, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("customer profile"))?;
    let query = service_request::Entity::find()
        .filter(service_request::Column::CustomerId.eq(customer.id))
        .order_by_desc(service_request::Column::DateOfRequest);
    with_status(query, status).all(db).await.map_err(ServiceError::db)
}

/// Requests assigned to the professional behind `user_id`.
pub async fn list_for_professional(
    db: &DatabaseConnection,
    user_id: i32,
    status: Option<RequestStatus>,
) -> Result<Vec<service_request::Model>, ServiceError> {
    let professional = professional::find_by_user(db, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("professional profile"))?;
    let query = service_request::Entity::find()
        .filter(service_request::Column::ProfessionalId.eq(professional.id))
        .order_by_desc(service_request::Column::DateOfRequest);
    with_status(query, status).all(db).await.map_err(ServiceError::db)
}

/// Open requests for the professional's service. Unverified professionals see nothing.
pub async fn pending_for_professional(db: &DatabaseConnection, user_id: i32) -> Result<Vec<service_request::Model>, ServiceError> {
    let professional = professional::find_by_user(db, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("professional profile"))?;
    if !professional.is_verified {
        return Err(ServiceError::Forbidden("your profile is not verified yet".into()));
    }
    let query = service_request::Entity::find()
        .filter(service_request::Column::ServiceId.eq(professional.service_id))
        .order_by_asc(service_request::Column::ScheduledDate);
    with_status(query, Some(RequestStatus::Requested)).all(db).await.map_err(ServiceError::db)
}

pub async fn list_all(db: &DatabaseConnection, status: Option<RequestStatus>) -> Result<Vec<service_request::Model>, ServiceError> {
    let query = service_request::Entity::find().order_by_desc(service_request::Column::DateOfRequest);
    with_status(query, status).all(db).await.map_err(ServiceError::db)
}

pub async fn recent(db: &DatabaseConnection, limit: u64) -> Result<Vec<service_request::Model>, ServiceError> {
    service_request::Entity::find()
        .order_by_desc(service_request::Column::DateOfRequest)
        .limit(limit)
        .all(db)
        .await
        .map_err(ServiceError::db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed, Seed};
    use models::service_request::RequestPatch;

    #[tokio::test]
    async fn listings_follow_ownership_and_status() -> anyhow::Result<()> {
        let Seed { db, customer_user, pro_user, professional, .. } = seed().await?;
        let a = crate::test_support::new_request(&db, &customer_user).await?;
        let _b = crate::test_support::new_request(&db, &customer_user).await?;

        let pending = pending_for_professional(&db, pro_user.id).await?;
        assert_eq!(pending.len(), 2);

        let accept = RequestPatch {
            status: Some(RequestStatus::Accepted),
            professional_id: Some(Some(professional.id)),
            ..Default::default()
        };
        assert!(service_request::update_if_version(&db, a.id, 0, &accept).await?);

        assert_eq!(pending_for_professional(&db, pro_user.id).await?.len(), 1);
        assert_eq!(list_for_professional(&db, pro_user.id, None).await?.len(), 1);
        assert_eq!(list_for_customer(&db, customer_user.id, None).await?.len(), 2);
        assert_eq!(list_for_customer(&db, customer_user.id, Some(RequestStatus::Accepted)).await?.len(), 1);
        assert_eq!(list_all(&db, Some(RequestStatus::Requested)).await?.len(), 1);
        assert_eq!(recent(&db, 5).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn legacy_status_rows_are_found_by_canonical_filter() -> anyhow::Result<()> {
        use sea_orm::{ActiveModelTrait, Set};
        let Seed { db, customer_user, .. } = seed().await?;
        let req = crate::test_support::new_request(&db, &customer_user).await?;
        let mut am: service_request::ActiveModel = req.into();
        am.status = Set("assigned".into());
        am.update(&db).await?;
        assert_eq!(list_all(&db, Some(RequestStatus::Accepted)).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("")).unwrap(), None);
        assert_eq!(parse_status_filter(Some("in_progress")).unwrap(), Some(RequestStatus::InProgress));
        assert!(parse_status_filter(Some("bogus")).is_err());
    }
}
