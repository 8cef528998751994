use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use common::types::Acknowledged;
use models::service_request;
use service::auth::AuthContext;
use service::lifecycle::{queries, Action};
use service::profiles::{self, Profile};

use crate::errors::JsonApiError;
use crate::routes::auth::ServerState;
use crate::routes::customer::RequestOut;

pub async fn profile(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Profile>, JsonApiError> {
    Ok(Json(profiles::get_profile(&state.db, ctx.user_id).await?))
}

#[utoipa::path(get, path = "/api/professional/service-requests/pending", tag = "professional", responses((status = 200, description = "Open requests for the professional's service"), (status = 403, description = "Profile not verified")))]
pub async fn pending(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<service_request::Model>>, JsonApiError> {
    Ok(Json(queries::pending_for_professional(&state.db, ctx.user_id).await?))
}

pub async fn assigned(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<service_request::Model>>, JsonApiError> {
    let status = queries::parse_status_filter(params.get("status").map(String::as_str))?;
    Ok(Json(queries::list_for_professional(&state.db, ctx.user_id, status).await?))
}

async fn transition(
    state: ServerState,
    ctx: AuthContext,
    id: i32,
    action: Action,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    let updated = state.lifecycle.transition_as_professional(ctx.user_id, id, action).await?;
    state.cache.invalidate_all();
    Ok(Json(Acknowledged::new(
        format!("Service request {} successfully", action.done()),
        RequestOut { service_request: updated },
    )))
}

#[utoipa::path(put, path = "/api/professional/service-requests/{id}/accept", tag = "professional", params(("id" = i32, Path, description = "Service request id")), responses((status = 200, description = "Accepted"), (status = 400, description = "Not in requested status"), (status = 403, description = "Unverified or wrong service"), (status = 409, description = "Another professional won the race")))]
pub async fn accept(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    transition(state, ctx, id, Action::Accept).await
}

#[utoipa::path(put, path = "/api/professional/service-requests/{id}/reject", tag = "professional", params(("id" = i32, Path, description = "Service request id")), responses((status = 200, description = "Back to requested"), (status = 400, description = "Request is closed")))]
pub async fn reject(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    transition(state, ctx, id, Action::Reject).await
}

pub async fn start(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    transition(state, ctx, id, Action::Start).await
}

#[utoipa::path(put, path = "/api/professional/service-requests/{id}/complete", tag = "professional", params(("id" = i32, Path, description = "Service request id")), responses((status = 200, description = "Completed"), (status = 403, description = "Assigned to someone else")))]
pub async fn complete(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
) -> Result<Json<Acknowledged<RequestOut>>, JsonApiError> {
    transition(state, ctx, id, Action::Complete).await
}
