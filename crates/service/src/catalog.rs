use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};

use models::service::ServiceInput;
use models::{professional, service, service_request, user};

use crate::errors::ServiceError;

/// A professional joined with the public parts of its user row.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalSummary {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub pin_code: String,
    pub is_active: bool,
    pub service_id: i32,
    pub experience: i32,
    pub description: String,
    pub is_verified: bool,
    pub avg_rating: f64,
}

impl ProfessionalSummary {
    pub fn from_parts(p: professional::Model, u: user::Model) -> Self {
        Self {
            id: p.id,
            user_id: u.id,
            username: u.username,
            full_name: u.full_name,
            email: u.email,
            pin_code: u.pin_code,
            is_active: u.is_active,
            service_id: p.service_id,
            experience: p.experience,
            description: p.description,
            is_verified: p.is_verified,
            avg_rating: p.avg_rating,
        }
    }
}

pub(crate) fn join_users(rows: Vec<(professional::Model, Option<user::Model>)>) -> Vec<ProfessionalSummary> {
    rows.into_iter()
        .filter_map(|(p, u)| u.map(|u| ProfessionalSummary::from_parts(p, u)))
        .collect()
}

/// Services matching `search` (name or description, case-insensitive).
/// With `pin_code`, only services a verified, active professional serves there.
#[instrument(skip(db))]
pub async fn list_services(
    db: &DatabaseConnection,
    search: Option<&str>,
    pin_code: Option<&str>,
) -> Result<Vec<service::Model>, ServiceError> {
    let mut query = service::Entity::find().order_by_asc(service::Column::Name);
    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(service::Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(service::Column::Description))).like(pattern)),
        );
    }
    if let Some(pin) = pin_code.map(str::trim).filter(|s| !s.is_empty()) {
        let served: Vec<i32> = professional::Entity::find()
            .find_also_related(user::Entity)
            .filter(professional::Column::IsVerified.eq(true))
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::PinCode.eq(pin))
            .all(db)
            .await
            .map_err(ServiceError::db)?
            .into_iter()
            .map(|(p, _)| p.service_id)
            .collect();
        query = query.filter(service::Column::Id.is_in(served));
    }
    query.all(db).await.map_err(ServiceError::db)
}

pub async fn get_service(db: &DatabaseConnection, id: i32) -> Result<service::Model, ServiceError> {
    service::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found("service"))
}

/// Verified professionals offering the service, best rated first.
pub async fn professionals_for_service(db: &DatabaseConnection, id: i32) -> Result<Vec<ProfessionalSummary>, ServiceError> {
    get_service(db, id).await?;
    let rows = professional::Entity::find()
        .find_also_related(user::Entity)
        .filter(professional::Column::ServiceId.eq(id))
        .filter(professional::Column::IsVerified.eq(true))
        .order_by_desc(professional::Column::AvgRating)
        .all(db)
        .await
        .map_err(ServiceError::db)?;
    Ok(join_users(rows))
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_service(db: &DatabaseConnection, input: ServiceInput) -> Result<service::Model, ServiceError> {
    if service::find_by_name(db, &input.name).await?.is_some() {
        return Err(ServiceError::Conflict(format!("service '{}' already exists", input.name.trim())));
    }
    let created = service::create(db, input).await?;
    info!(service_id = created.id, "service created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update_service(db: &DatabaseConnection, id: i32, input: ServiceInput) -> Result<service::Model, ServiceError> {
    if let Some(other) = service::find_by_name(db, &input.name).await? {
        if other.id != id {
            return Err(ServiceError::Conflict(format!("service '{}' already exists", input.name.trim())));
        }
    }
    Ok(service::update(db, id, input).await?)
}

/// Refused while any professional or request still points at the service.
#[instrument(skip(db))]
pub async fn delete_service(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let found = get_service(db, id).await?;
    let professionals = professional::Entity::find()
        .filter(professional::Column::ServiceId.eq(id))
        .count(db)
        .await
        .map_err(ServiceError::db)?;
    let requests = service_request::Entity::find()
        .filter(service_request::Column::ServiceId.eq(id))
        .count(db)
        .await
        .map_err(ServiceError::db)?;
    if professionals > 0 || requests > 0 {
        return Err(ServiceError::Conflict(format!(
            "service '{}' is still referenced by {professionals} professional(s) and {requests} request(s)",
            found.name
        )));
    }
    service::Entity::delete_by_id(id).exec(db).await.map_err(ServiceError::db)?;
    info!(service_id = id, "service deleted");
    Ok(())
}
