use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;

use common::types::Acknowledged;
use models::{review, service_request};
use service::auth::AuthContext;
use service::cache::cache_key;
use service::catalog::{self, ProfessionalSummary};
use service::lifecycle::queries;
use service::lifecycle::service::{CreateRequestInput, UpdateRequestInput};
use service::rating::{self, ReviewInput};

use crate::errors::JsonApiError;
use crate::routes::auth::ServerState;

#[derive(Serialize)]
pub struct RequestOut {
    pub service_request: service_request::Model,
}

#[derive(Serialize)]
pub struct ReviewOut {
    pub review: review::Model,
}

fn param<'a>(params: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str)
}

#[utoipa::path(get, path = "/api/customer/services", tag = "customer", params(("search" = Option<String>, Query, description = "Name or description contains"), ("pin_code" = Option<String>, Query, description = "Served by a verified professional in this pin code")), responses((status = 200, description = "Matching services")))]
pub async fn list_services(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<models::service::Model>>, JsonApiError> {
    let key = cache_key("/customer/services", &params);
    let db = state.db.clone();
    let services = state
        .cache
        .get_or_try_insert_with(key, || async move {
            catalog::list_services(&db, param(&params, "search"), param(&params, "pin_code")).await
        })
        .await?;
    Ok(Json(services))
}

pub async fn get_service(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<models::service::Model>, JsonApiError> {
    Ok(Json(catalog::get_service(&state.db, id).await?))
}

pub async fn service_professionals(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ProfessionalSummary>>, JsonApiError> {
    Ok(Json(catalog::professionals_for_service(&state.db, id).await?))
}

#[utoipa::path(post, path = "/api/customer/service-requests", tag = "customer", request_body = crate::openapi::CreateRequestBody, responses((status = 201, description = "Created"), (status = 403, description = "Customer blocked"), (status = 404, description = "Unknown service")))]
pub async fn create_request(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateRequestInput>,
) -> Result<(StatusCode, Json<Acknowledged<RequestOut>>), JsonApiError> {
    let created = state.lifecycle.create_request(ctx.user_id, input).await?;
    state.cache.invalidate_all();
    Ok((
        StatusCode::CREATED,
        Json(Acknowledged::new("Service request created successfully", RequestOut { service_request: created })),
    ))
}

pub async fn list_requests(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<service_request::Model>>, JsonApiError> {
    let status = queries::parse_status_filter(param(&params, "status"))?;
    Ok(Json(queries::list_for_customer(&state.db, ctx.user_id, status).await?))
}

#[utoipa::path(put, path = "/api/customer/service-requests/{id}", tag = "customer", params(("id" = i32, Path, description = "Service request id")), request_body = crate::openapi::UpdateRequestBody, responses((status = 200, description = "Updated"), (status = 400, description = "Invalid transition or date"), (status = 409, description = "Concurrent modification")))]
pub async fn update_request(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateRequestInput>,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    let updated = state.lifecycle.update_by_customer(ctx.user_id, id, input).await?;
    state.cache.invalidate_all();
    Ok(Json(Acknowledged::new("Service request updated successfully", RequestOut { service_request: updated })))
}

#[utoipa::path(post, path = "/api/customer/service-requests/{id}/reviews", tag = "customer", params(("id" = i32, Path, description = "Service request id")), request_body = crate::openapi::ReviewBody, responses((status = 201, description = "Review stored"), (status = 400, description = "Invalid rating or request not finished"), (status = 409, description = "Already reviewed")))]
pub async fn create_review(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Acknowledged<ReviewOut>>), JsonApiError> {
    let created = rating::create_review(&state.db, ctx.user_id, id, input).await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(Acknowledged::new("Review submitted successfully", ReviewOut { review: created }))))
}
