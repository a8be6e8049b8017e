// src/config.rs
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const APP_ID_VAR: &str = "EXCHANGE_APP_ID";
pub const ADMIN_TOKEN_VAR: &str = "EXCHANGE_ADMIN_TOKEN";

#[derive(Clone)]
pub struct Config {
    /// Public application id; picks the tenant database file.
    pub app_id: Option<String>,
    /// Private token that unlocks privileged writes.
    pub admin_token: Option<String>,
    pub data_dir: PathBuf,
    pub bind: String,
    pub workers: usize,
    pub schema_path: String,
    pub sevis_endpoint: Option<String>,
    pub sevis_api_key: Option<String>,
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay: Duration::from_millis(250),
        }
    }
}

// Keep the admin token out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<set>"))
            .field("data_dir", &self.data_dir)
            .field("bind", &self.bind)
            .field("workers", &self.workers)
            .field("schema_path", &self.schema_path)
            .field("sevis_endpoint", &self.sevis_endpoint)
            .field("sevis_api_key", &self.sevis_api_key.as_ref().map(|_| "<set>"))
            .field("migration", &self.migration)
            .finish()
    }
}

impl Config {
    pub fn load() -> Self {
        Self {
            app_id: optional(APP_ID_VAR),
            admin_token: optional(ADMIN_TOKEN_VAR),
            data_dir: PathBuf::from(try_load::<String>("EXCHANGE_DATA_DIR", "data")),
            bind: try_load("EXCHANGE_BIND", "127.0.0.1:3000"),
            workers: try_load("EXCHANGE_WORKERS", "8"),
            schema_path: try_load("EXCHANGE_SCHEMA_PATH", "sql/schema.sql"),
            sevis_endpoint: optional("SEVIS_ENDPOINT"),
            sevis_api_key: var("SEVIS_API_KEY"),
            migration: MigrationConfig {
                batch_size: try_load("MIGRATION_BATCH_SIZE", "50"),
                batch_delay: Duration::from_millis(try_load("MIGRATION_BATCH_DELAY_MS", "250")),
            },
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            app_id: None,
            admin_token: None,
            data_dir: PathBuf::from("data"),
            bind: "127.0.0.1:0".to_string(),
            workers: 1,
            schema_path: "sql/schema.sql".to_string(),
            sevis_endpoint: None,
            sevis_api_key: None,
            migration: MigrationConfig::default(),
        }
    }

    /// Database file for the configured tenant, if any.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.app_id
            .as_ref()
            .map(|id| self.data_dir.join(format!("{id}.sqlite3")))
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional(key: &str) -> Option<String> {
    let value = var(key);
    if value.is_none() {
        warn!("{key} not set; the dependent client stays disabled");
    }
    value
}

// Invalid values fall back to the default rather than aborting start-up.
fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let parse_default = || {
        default
            .parse::<T>()
            .unwrap_or_else(|e| panic!("default for {key} must parse: {e}"))
    };

    match var(key) {
        None => {
            info!("{key} not set, using default: {default}");
            parse_default()
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default: {default}");
            parse_default()
        }),
    }
}
