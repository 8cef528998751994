//! Moderation and overview operations behind the admin routes.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};

use models::user::{self, Role};
use models::{customer, professional, service, service_request, RequestStatus};

use crate::catalog::{join_users, ProfessionalSummary};
use crate::errors::ServiceError;
use crate::lifecycle::queries;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_users: u64,
    pub total_customers: u64,
    pub total_professionals: u64,
    pub total_services: u64,
    pub total_service_requests: u64,
    pub pending_verifications: u64,
    pub requests_by_status: Vec<StatusCount>,
    pub recent_requests: Vec<service_request::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub preferences: String,
    pub is_blocked: bool,
}

impl CustomerSummary {
    fn from_parts(c: customer::Model, u: user::Model) -> Self {
        Self {
            id: c.id,
            user_id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            preferences: c.preferences,
            is_blocked: c.is_blocked,
        }
    }
}

const RECENT_REQUESTS: u64 = 5;

#[instrument(skip(db))]
pub async fn dashboard(db: &DatabaseConnection) -> Result<Dashboard, ServiceError> {
    let mut requests_by_status = Vec::with_capacity(RequestStatus::ALL.len());
    for status in RequestStatus::ALL {
        let count = service_request::Entity::find()
            .filter(service_request::Column::Status.is_in(status.stored_aliases().iter().copied()))
            .count(db)
            .await
            .map_err(ServiceError::db)?;
        requests_by_status.push(StatusCount { status, count });
    }
    Ok(Dashboard {
        total_users: user::Entity::find().count(db).await.map_err(ServiceError::db)?,
        total_customers: customer::Entity::find().count(db).await.map_err(ServiceError::db)?,
        total_professionals: professional::Entity::find().count(db).await.map_err(ServiceError::db)?,
        total_services: service::Entity::find().count(db).await.map_err(ServiceError::db)?,
        total_service_requests: service_request::Entity::find().count(db).await.map_err(ServiceError::db)?,
        pending_verifications: professional::Entity::find()
            .filter(professional::Column::IsVerified.eq(false))
            .count(db)
            .await
            .map_err(ServiceError::db)?,
        requests_by_status,
        recent_requests: queries::recent(db, RECENT_REQUESTS).await?,
    })
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, ServiceError> {
    user::Entity::find().order_by_asc(user::Column::Id).all(db).await.map_err(ServiceError::db)
}

pub async fn list_customers(db: &DatabaseConnection) -> Result<Vec<CustomerSummary>, ServiceError> {
    let rows = customer::Entity::find()
        .find_also_related(user::Entity)
        .order_by_asc(customer::Column::Id)
        .all(db)
        .await
        .map_err(ServiceError::db)?;
    Ok(rows
        .into_iter()
        .filter_map(|(c, u)| u.map(|u| CustomerSummary::from_parts(c, u)))
        .collect())
}

pub async fn list_professionals(db: &DatabaseConnection) -> Result<Vec<ProfessionalSummary>, ServiceError> {
    let rows = professional::Entity::find()
        .find_also_related(user::Entity)
        .order_by_asc(professional::Column::Id)
        .all(db)
        .await
        .map_err(ServiceError::db)?;
    Ok(join_users(rows))
}

/// Flip the verification gate.
#[instrument(skip(db))]
pub async fn toggle_verification(db: &DatabaseConnection, professional_id: i32) -> Result<professional::Model, ServiceError> {
    let updated = professional::toggle_verified(db, professional_id).await.map_err(|e| match e {
        models::errors::ModelError::NotFound(what) => ServiceError::not_found(what),
        other => other.into(),
    })?;
    info!(verified = updated.is_verified, "professional verification toggled");
    Ok(updated)
}

/// Block or unblock by customer id. Admin accounts are never blocked.
#[instrument(skip(db))]
pub async fn set_customer_blocked(
    db: &DatabaseConnection,
    customer_id: i32,
    blocked: bool,
) -> Result<CustomerSummary, ServiceError> {
    let (found, owner) = customer::Entity::find_by_id(customer_id)
        .find_also_related(user::Entity)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found("customer"))?;
    let owner = owner.ok_or_else(|| ServiceError::not_found("user"))?;
    if blocked && owner.role()? == Role::Admin {
        return Err(ServiceError::Forbidden("cannot block admin user".into()));
    }
    let updated = customer::set_blocked(db, found.id, blocked).await?;
    info!(blocked, "customer block flag changed");
    Ok(CustomerSummary::from_parts(updated, owner))
}
