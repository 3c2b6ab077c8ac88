use std::env;
use std::path::PathBuf;

pub const MIN_SECRET_LEN: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("SESSION_SECRET must be at least {MIN_SECRET_LEN} characters long")]
    WeakSecret,
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, built once in `main` and handed to handlers via `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Compared against the `token` field of every Slack delivery.
    pub slack_verification_token: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub enable_hsts: bool,
    pub worker_enabled: bool,
}

fn flag(name: &str) -> bool {
    env::var(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).ok().filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(name))
}

impl AppConfig {
    pub fn new(slack_verification_token: impl Into<String>, session_secret: impl Into<String>) -> Self {
        Self {
            slack_verification_token: slack_verification_token.into(),
            session_secret: session_secret.into(),
            session_ttl_hours: 24,
            bind_addr: "0.0.0.0:8080".into(),
            database_url: None,
            data_dir: None,
            allowed_origins: Vec::new(),
            enable_hsts: false,
            worker_enabled: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::new(required("SLACK_VERIFICATION_TOKEN")?, required("SESSION_SECRET")?);
        if cfg.session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        if let Ok(ttl) = env::var("SESSION_TTL_HOURS") {
            cfg.session_ttl_hours = ttl
                .parse()
                .ok()
                .filter(|h: &i64| *h > 0)
                .ok_or(ConfigError::Invalid { name: "SESSION_TTL_HOURS", value: ttl })?;
        }
        if let Ok(addr) = env::var("BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        cfg.database_url = env::var("DATABASE_URL").ok();
        if cfg!(feature = "postgres-store") && cfg.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        cfg.data_dir = env::var("PINS_DATA_DIR").ok().map(PathBuf::from);
        cfg.allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default();
        cfg.enable_hsts = flag("ENABLE_HSTS");
        cfg.worker_enabled = flag("PINS_WORKER_ENABLED");
        Ok(cfg)
    }
}
