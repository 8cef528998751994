use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use common::types::Acknowledged;
use models::service::ServiceInput;
use models::{professional, service_request, user};
use service::admin::{self, CustomerSummary, Dashboard};
use service::cache::cache_key;
use service::catalog::{self, ProfessionalSummary};
use service::jobs::{self, JobKind};
use service::lifecycle::queries;
use service::rating;

use crate::errors::JsonApiError;
use crate::routes::auth::ServerState;

#[derive(Serialize)]
pub struct ServiceOut {
    pub service: models::service::Model,
}

#[derive(Serialize)]
pub struct ProfessionalOut {
    pub professional: professional::Model,
}

#[derive(Serialize)]
pub struct CustomerOut {
    pub customer: CustomerSummary,
}

#[derive(Serialize)]
pub struct UsersOut {
    pub users: Vec<user::Model>,
}

#[derive(Serialize)]
pub struct TaskOut {
    pub task_id: Uuid,
}

#[derive(Serialize)]
pub struct RecomputeOut {
    pub updated: usize,
}

#[utoipa::path(get, path = "/api/admin/services", tag = "admin", responses((status = 200, description = "All services")))]
pub async fn list_services(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<models::service::Model>>, JsonApiError> {
    let key = cache_key("/admin/services", &params);
    let db = state.db.clone();
    let services = state
        .cache
        .get_or_try_insert_with(key, || async move {
            catalog::list_services(&db, params.get("search").map(String::as_str), None).await
        })
        .await?;
    Ok(Json(services))
}

#[utoipa::path(post, path = "/api/admin/services", tag = "admin", request_body = crate::openapi::ServiceBody, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 409, description = "Name taken")))]
pub async fn create_service(
    State(state): State<ServerState>,
    Json(input): Json<ServiceInput>,
) -> Result<(StatusCode, Json<Acknowledged<ServiceOut>>), JsonApiError> {
    let created = catalog::create_service(&state.db, input).await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(Acknowledged::new("Service created successfully", ServiceOut { service: created }))))
}

#[utoipa::path(put, path = "/api/admin/services/{id}", tag = "admin", params(("id" = i32, Path, description = "Service id")), request_body = crate::openapi::ServiceBody, responses((status = 200, description = "Updated"), (status = 404, description = "Not Found")))]
pub async fn update_service(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(input): Json<ServiceInput>,
) -> Result<Json<Acknowledged<ServiceOut>>, JsonApiError> {
    let updated = catalog::update_service(&state.db, id, input).await?;
    state.cache.invalidate_all();
    Ok(Json(Acknowledged::new("Service updated successfully", ServiceOut { service: updated })))
}

#[utoipa::path(delete, path = "/api/admin/services/{id}", tag = "admin", params(("id" = i32, Path, description = "Service id")), responses((status = 200, description = "Deleted"), (status = 409, description = "Still referenced")))]
pub async fn delete_service(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    catalog::delete_service(&state.db, id).await?;
    state.cache.invalidate_all();
    Ok(Json(serde_json::json!({"message": "Service deleted successfully"})))
}

pub async fn list_professionals(State(state): State<ServerState>) -> Result<Json<Vec<ProfessionalSummary>>, JsonApiError> {
    Ok(Json(admin::list_professionals(&state.db).await?))
}

pub async fn list_customers(State(state): State<ServerState>) -> Result<Json<Vec<CustomerSummary>>, JsonApiError> {
    Ok(Json(admin::list_customers(&state.db).await?))
}

pub async fn list_users(State(state): State<ServerState>) -> Result<Json<UsersOut>, JsonApiError> {
    Ok(Json(UsersOut { users: admin::list_users(&state.db).await? }))
}

#[utoipa::path(get, path = "/api/admin/requests", tag = "admin", params(("status" = Option<String>, Query, description = "Filter by lifecycle status")), responses((status = 200, description = "All service requests"), (status = 400, description = "Unknown status")))]
pub async fn list_requests(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<service_request::Model>>, JsonApiError> {
    let status = queries::parse_status_filter(params.get("status").map(String::as_str))?;
    let key = cache_key("/admin/requests", &params);
    let db = state.db.clone();
    let requests = state
        .cache
        .get_or_try_insert_with(key, || async move { queries::list_all(&db, status).await })
        .await?;
    Ok(Json(requests))
}

#[utoipa::path(put, path = "/api/admin/professionals/{id}/verify", tag = "admin", params(("id" = i32, Path, description = "Professional id")), responses((status = 200, description = "Verification flag toggled"), (status = 404, description = "Not Found")))]
pub async fn toggle_verification(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<Acknowledged<ProfessionalOut>>, JsonApiError> {
    let updated = admin::toggle_verification(&state.db, id).await?;
    state.cache.invalidate_all();
    let message = if updated.is_verified { "Professional verified successfully" } else { "Professional unverified successfully" };
    Ok(Json(Acknowledged::new(message, ProfessionalOut { professional: updated })))
}

async fn set_blocked(state: ServerState, id: i32, blocked: bool) -> Result<Json<Acknowledged<CustomerOut>>, JsonApiError> {
    let updated = admin::set_customer_blocked(&state.db, id, blocked).await?;
    state.cache.invalidate_all();
    let message = if blocked { "Customer blocked successfully" } else { "Customer unblocked successfully" };
    Ok(Json(Acknowledged::new(message, CustomerOut { customer: updated })))
}

#[utoipa::path(put, path = "/api/admin/customers/{id}/block", tag = "admin", params(("id" = i32, Path, description = "Customer id")), responses((status = 200, description = "Blocked"), (status = 403, description = "Admin accounts cannot be blocked")))]
pub async fn block_customer(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<Acknowledged<CustomerOut>>, JsonApiError> {
    set_blocked(state, id, true).await
}

pub async fn unblock_customer(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<Acknowledged<CustomerOut>>, JsonApiError> {
    set_blocked(state, id, false).await
}

#[utoipa::path(get, path = "/api/admin/dashboard", tag = "admin", responses((status = 200, description = "Counts and recent activity")))]
pub async fn dashboard(State(state): State<ServerState>) -> Result<Json<Dashboard>, JsonApiError> {
    Ok(Json(admin::dashboard(&state.db).await?))
}

/// Queue the monthly report in the background and hand back a task id.
#[utoipa::path(post, path = "/api/admin/trigger-monthly-report", tag = "admin", responses((status = 202, description = "Report queued")))]
pub async fn trigger_monthly_report(State(state): State<ServerState>) -> (StatusCode, Json<Acknowledged<TaskOut>>) {
    let task_id = Uuid::new_v4();
    let ctx = Arc::clone(&state.jobs);
    tokio::spawn(async move {
        let _ = jobs::run_job_for(&ctx, JobKind::MonthlyReport, None).await;
    });
    info!(%task_id, "monthly report queued");
    (StatusCode::ACCEPTED, Json(Acknowledged::new("Monthly report generation started", TaskOut { task_id })))
}

#[utoipa::path(post, path = "/api/admin/recompute-ratings", tag = "admin", responses((status = 200, description = "Ratings recomputed")))]
pub async fn recompute_ratings(State(state): State<ServerState>) -> Result<Json<Acknowledged<RecomputeOut>>, JsonApiError> {
    let updated = rating::recompute_all(&state.db).await?;
    state.cache.invalidate_all();
    Ok(Json(Acknowledged::new("Ratings recomputed successfully", RecomputeOut { updated })))
}
