pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod security;
pub mod views;

// Re-export commonly used items for tests / external users
pub use config::AppConfig;
pub use routes::{config, worker_config, AppState};
pub use security::SecurityHeaders;
