//! Engine configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("SKYHAUL_DB_PATH")
                .unwrap_or_else(|_| "data/skyhaul.db".to_string()),
            db_max_connections: env::var("SKYHAUL_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}
