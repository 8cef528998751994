use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use tracing::warn;

/// Signing secret used when neither `auth.jwt_secret` nor `JWT_SECRET` is set.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Credentials for the admin account created at startup when none exists.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub full_name: String,
}

fn default_admin_name() -> String { "Administrator".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_token_ttl_hours(), bootstrap_admin: None }
    }
}

fn default_token_ttl_hours() -> i64 { 12 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self { Self { ttl_secs: default_cache_ttl(), max_capacity: default_cache_capacity() } }
}

fn default_cache_ttl() -> u64 { 300 }
fn default_cache_capacity() -> u64 { 1_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Spawn the periodic scheduler inside the HTTP server process.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_daily_interval")]
    pub daily_interval_secs: u64,
    #[serde(default = "default_monthly_interval")]
    pub monthly_interval_secs: u64,
    #[serde(default = "default_ratings_interval")]
    pub ratings_interval_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_interval_secs: default_daily_interval(),
            monthly_interval_secs: default_monthly_interval(),
            ratings_interval_secs: default_ratings_interval(),
            retry_max_attempts: default_retry_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_daily_interval() -> u64 { 24 * 60 * 60 }
fn default_monthly_interval() -> u64 { 30 * 24 * 60 * 60 }
fn default_ratings_interval() -> u64 { 6 * 60 * 60 }
fn default_retry_attempts() -> u32 { 3 }
fn default_backoff_base() -> u64 { 1_000 }
fn default_backoff_max() -> u64 { 60_000 }
fn default_retention_days() -> i64 { 365 }

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_sender")]
    pub sender: String,
    /// When set, emails are POSTed to this relay instead of only being logged.
    #[serde(default)]
    pub relay_url: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self { Self { sender: default_sender(), relay_url: None } }
}

fn default_sender() -> String { "no-reply@household.local".into() }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LifecycleConfig {
    /// Only the assigned professional may reject an assigned request.
    #[serde(default)]
    pub strict_reject: bool,
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Defaults plus environment, for running without a config file.
    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") { cfg.server.host = host; }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.jobs.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.to_lowercase().starts_with("sqlite:")
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || self.is_sqlite()) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

/// Configured secret, else `from_env`, else [`DEV_JWT_SECRET`] with a warning.
pub fn resolve_jwt_secret(configured: &str, from_env: Option<String>) -> String {
    if !configured.trim().is_empty() {
        return configured.to_string();
    }
    match from_env.filter(|s| !s.trim().is_empty()) {
        Some(secret) => secret,
        None => {
            warn!(event = "insecure_jwt_secret", "auth.jwt_secret and JWT_SECRET are unset; signing tokens with the development secret");
            DEV_JWT_SECRET.to_string()
        }
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        self.jwt_secret = resolve_jwt_secret(&self.jwt_secret, std::env::var("JWT_SECRET").ok());
        if self.token_ttl_hours <= 0 {
            self.token_ttl_hours = default_token_ttl_hours();
        }
    }
}

impl JobsConfig {
    fn validate(&self) -> Result<()> {
        if self.daily_interval_secs == 0 || self.monthly_interval_secs == 0 || self.ratings_interval_secs == 0 {
            return Err(anyhow!("jobs intervals must be positive seconds"));
        }
        if self.retry_max_attempts == 0 {
            return Err(anyhow!("jobs.retry_max_attempts must be >= 1"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("jobs.backoff_max_ms must be >= backoff_base_ms"));
        }
        if self.retention_days <= 0 {
            return Err(anyhow!("jobs.retention_days must be positive"));
        }
        Ok(())
    }
}
