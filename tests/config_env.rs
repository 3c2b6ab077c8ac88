use pins4days::config::{AppConfig, ConfigError};
use serial_test::serial;

const VARS: &[&str] = &[
    "SLACK_VERIFICATION_TOKEN",
    "SESSION_SECRET",
    "SESSION_TTL_HOURS",
    "BIND_ADDR",
    "DATABASE_URL",
    "PINS_DATA_DIR",
    "ALLOWED_ORIGINS",
    "ENABLE_HSTS",
    "PINS_WORKER_ENABLED",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

fn base_env() {
    clear_env();
    std::env::set_var("SLACK_VERIFICATION_TOKEN", "verification-token-0");
    std::env::set_var("SESSION_SECRET", "test-secret-must-be-32-bytes-long!!");
    if cfg!(feature = "postgres-store") {
        std::env::set_var("DATABASE_URL", "postgres://localhost/pins");
    }
}

#[test]
#[serial]
fn test_missing_token_is_rejected() {
    clear_env();
    std::env::set_var("SESSION_SECRET", "test-secret-must-be-32-bytes-long!!");
    assert_eq!(AppConfig::from_env().unwrap_err(), ConfigError::Missing("SLACK_VERIFICATION_TOKEN"));
}

#[test]
#[serial]
fn test_short_secret_is_rejected() {
    base_env();
    std::env::set_var("SESSION_SECRET", "short");
    assert_eq!(AppConfig::from_env().unwrap_err(), ConfigError::WeakSecret);
}

#[test]
#[serial]
fn test_defaults() {
    base_env();
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.slack_verification_token, "verification-token-0");
    assert_eq!(cfg.session_ttl_hours, 24);
    assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    assert!(cfg.data_dir.is_none());
    assert!(cfg.allowed_origins.is_empty());
    assert!(!cfg.enable_hsts);
    assert!(!cfg.worker_enabled);
}

#[test]
#[serial]
fn test_overrides() {
    base_env();
    std::env::set_var("SESSION_TTL_HOURS", "6");
    std::env::set_var("BIND_ADDR", "127.0.0.1:9000");
    std::env::set_var("PINS_DATA_DIR", "/tmp/pins");
    std::env::set_var("ALLOWED_ORIGINS", "https://a.example, https://b.example,");
    std::env::set_var("ENABLE_HSTS", "true");
    std::env::set_var("PINS_WORKER_ENABLED", "1");
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.session_ttl_hours, 6);
    assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    assert_eq!(cfg.data_dir.as_deref(), Some(std::path::Path::new("/tmp/pins")));
    assert_eq!(cfg.allowed_origins, vec!["https://a.example", "https://b.example"]);
    assert!(cfg.enable_hsts);
    assert!(cfg.worker_enabled);
    clear_env();
}

#[test]
#[serial]
fn test_bad_ttl_is_rejected() {
    base_env();
    std::env::set_var("SESSION_TTL_HOURS", "soon");
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Invalid { name: "SESSION_TTL_HOURS", .. })));
    clear_env();
}
