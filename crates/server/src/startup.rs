use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};
use service::auth::repo::SeaOrmAuthRepository;
use service::auth::service::AuthConfig;
use service::auth::AuthService;
use service::cache::ResponseCache;
use service::jobs::scheduler::JobScheduler;
use service::jobs::JobContext;
use service::lifecycle::repo::SeaOrmLifecycleRepository;
use service::lifecycle::{LifecycleService, Policy};
use service::notify::mailer_from_config;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// `config.toml` (or `CONFIG_PATH`) when present, otherwise defaults plus environment.
fn load_config() -> Result<AppConfig, StartupError> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(error = %e, "config file unavailable, falling back to environment");
            AppConfig::from_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))
        }
    }
}

/// Wire the shared services around an already migrated connection.
pub fn build_state(cfg: &AppConfig, db: DatabaseConnection) -> anyhow::Result<ServerState> {
    let auth = AuthService::new(Arc::new(SeaOrmAuthRepository::new(db.clone())), AuthConfig::from_app(&cfg.auth));
    let lifecycle = LifecycleService::new(
        Arc::new(SeaOrmLifecycleRepository::new(db.clone())),
        Policy::from_config(&cfg.lifecycle),
    );
    let mailer = mailer_from_config(&cfg.mail).context("building mailer")?;
    let cache = ResponseCache::from_config(&cfg.cache);
    let jobs = JobContext::new(db.clone(), mailer, &cfg.jobs).with_cache(cache.clone());
    Ok(ServerState {
        db,
        auth: Arc::new(auth),
        lifecycle: Arc::new(lifecycle),
        cache,
        jobs: Arc::new(jobs),
    })
}

pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutdown signal received");
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = load_config()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    models::db::migrate(&db).await?;

    let state = build_state(&cfg, db)?;
    if let Some(admin) = &cfg.auth.bootstrap_admin {
        if let Some(created) = state.auth.ensure_admin(admin).await? {
            info!(username = %created.username, "bootstrap admin created");
        }
    }

    let scheduler = cfg
        .jobs
        .enabled
        .then(|| JobScheduler::spawn(Arc::clone(&state.jobs), &cfg.jobs));
    if let Some(s) = &scheduler {
        info!(jobs = s.len(), "background scheduler started");
    }

    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("invalid server.host/server.port")?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(s) = scheduler {
        s.shutdown();
    }
    Ok(())
}
