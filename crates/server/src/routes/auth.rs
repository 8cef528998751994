use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::warn;

use common::types::Acknowledged;
use models::user::Role;
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::auth::repo::SeaOrmAuthRepository;
use service::auth::{AuthContext, AuthService};
use service::cache::ResponseCache;
use service::jobs::JobContext;
use service::lifecycle::repo::SeaOrmLifecycleRepository;
use service::lifecycle::LifecycleService;
use service::profiles::{self, Profile, ProfileUpdate};

use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub lifecycle: Arc<LifecycleService<SeaOrmLifecycleRepository>>,
    pub cache: ResponseCache,
    pub jobs: Arc<JobContext>,
}

#[derive(Serialize)]
pub struct UserOut {
    pub user: AuthUser,
}

#[derive(Serialize)]
pub struct LoginOut {
    pub token: String,
    pub user: AuthUser,
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Acknowledged<UserOut>>), JsonApiError> {
    let user = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(Acknowledged::new("User registered successfully", UserOut { user }))))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<Acknowledged<LoginOut>>), JsonApiError> {
    let session = state.auth.login(input).await?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let out = LoginOut { token: session.token, user: session.user };
    Ok((jar.add(cookie), Json(Acknowledged::new("Login successful", out))))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "auth", responses((status = 200, description = "Logged out")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, Json(serde_json::json!({"message": "Logout successful"})))
}

#[utoipa::path(get, path = "/api/auth/profile", tag = "auth", responses((status = 200, description = "Current user and role profile"), (status = 401, description = "Unauthorized")))]
pub async fn profile(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Profile>, JsonApiError> {
    Ok(Json(profiles::get_profile(&state.db, ctx.user_id).await?))
}

#[utoipa::path(put, path = "/api/auth/profile", tag = "auth", request_body = crate::openapi::ProfileUpdateRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Bad Request")))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(patch): Json<ProfileUpdate>,
) -> Result<Json<Acknowledged<Profile>>, JsonApiError> {
    let updated = profiles::update_profile(&state.db, ctx.user_id, patch).await?;
    state.cache.invalidate_all();
    Ok(Json(Acknowledged::new("Profile updated successfully", updated)))
}

/// Bearer header first, then the `auth_token` cookie.
fn extract_token(req: &Request) -> Option<String> {
    if let Some(h) = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return h.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }
    CookieJar::from_headers(req.headers())
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify the token and attach the caller's [`AuthContext`] to the request.
pub async fn require_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let Some(token) = extract_token(&req) else {
        warn!(%path, "missing bearer token and auth_token cookie");
        return Err(JsonApiError::unauthorized("authentication required"));
    };
    let ctx = state.auth.verify_token(&token).map_err(|e| {
        warn!(%path, error = %e, "token validation failed");
        JsonApiError::from(e)
    })?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

fn require_role(ctx: &AuthContext, role: Role) -> Result<(), JsonApiError> {
    if ctx.role != role {
        return Err(JsonApiError::forbidden(format!("{role} access required")));
    }
    Ok(())
}

pub async fn require_admin(Extension(ctx): Extension<AuthContext>, req: Request, next: Next) -> Result<Response, JsonApiError> {
    require_role(&ctx, Role::Admin)?;
    Ok(next.run(req).await)
}

pub async fn require_customer(Extension(ctx): Extension<AuthContext>, req: Request, next: Next) -> Result<Response, JsonApiError> {
    require_role(&ctx, Role::Customer)?;
    Ok(next.run(req).await)
}

pub async fn require_professional(Extension(ctx): Extension<AuthContext>, req: Request, next: Next) -> Result<Response, JsonApiError> {
    require_role(&ctx, Role::Professional)?;
    Ok(next.run(req).await)
}
