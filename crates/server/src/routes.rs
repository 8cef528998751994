pub mod admin;
pub mod auth;
pub mod customer;
pub mod professional;

use axum::{
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::metrics::encode_metrics;
use common::types::Health;

use crate::openapi::ApiDoc;
use auth::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    let (code, body) = encode_metrics();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn auth_routes(state: &ServerState) -> Router<ServerState> {
    let protected = Router::new()
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(protected)
}

fn customer_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/services", get(customer::list_services))
        .route("/services/:id", get(customer::get_service))
        .route("/services/:id/professionals", get(customer::service_professionals))
        .route("/service-requests", get(customer::list_requests).post(customer::create_request))
        .route("/service-requests/:id", put(customer::update_request))
        .route("/service-requests/:id/reviews", post(customer::create_review))
        .route_layer(middleware::from_fn(auth::require_customer))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
}

fn professional_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/profile", get(professional::profile))
        .route("/service-requests", get(professional::assigned))
        .route("/service-requests/pending", get(professional::pending))
        .route("/service-requests/:id/accept", put(professional::accept))
        .route("/service-requests/:id/reject", put(professional::reject))
        .route("/service-requests/:id/start", put(professional::start))
        .route("/service-requests/:id/complete", put(professional::complete))
        .route_layer(middleware::from_fn(auth::require_professional))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
}

fn admin_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/services", get(admin::list_services).post(admin::create_service))
        .route("/services/:id", put(admin::update_service).delete(admin::delete_service))
        .route("/professionals", get(admin::list_professionals))
        .route("/professionals/:id/verify", put(admin::toggle_verification))
        .route("/customers", get(admin::list_customers))
        .route("/customers/:id/block", put(admin::block_customer))
        .route("/customers/:id/unblock", put(admin::unblock_customer))
        .route("/users", get(admin::list_users))
        .route("/requests", get(admin::list_requests))
        .route("/dashboard", get(admin::dashboard))
        .route("/trigger-monthly-report", post(admin::trigger_monthly_report))
        .route("/recompute-ratings", post(admin::recompute_ratings))
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
}

/// Build the full application router: public probes, auth, and one nested router per role.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let api = Router::new()
        .nest("/api/auth", auth_routes(&state))
        .nest("/api/customer", customer_routes(&state))
        .nest("/api/professional", professional_routes(&state))
        .nest("/api/admin", admin_routes(&state));

    public
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
