// src/db/clients.rs
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::connection::{init_db, AdminDatabase, Database};
use crate::errors::ServerError;

/// The store capabilities available to this process, decided once at start.
///
/// `db` is missing when no application id is configured or the database could
/// not be opened; `admin` additionally requires the admin token.
#[derive(Clone, Debug, Default)]
pub struct StoreClients {
    pub db: Option<Database>,
    pub admin: Option<AdminDatabase>,
}

impl StoreClients {
    pub fn connect(config: &Config) -> Self {
        let Some(path) = config.database_path() else {
            warn!("no application id configured; pages will show fallback data");
            return Self::default();
        };

        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!(dir = %dir.display(), "cannot create data directory: {e}");
                return Self::default();
            }
        }

        let db = Database::new(path.to_string_lossy());
        if let Err(e) = init_db(&db, &config.schema_path) {
            error!("store initialisation failed, continuing without it: {e}");
            return Self::default();
        }

        let admin = match &config.admin_token {
            Some(_) => Some(AdminDatabase::new(db.clone())),
            None => {
                info!("admin token missing; write actions are disabled");
                None
            }
        };

        Self { db: Some(db), admin }
    }

    /// Both capabilities over an already initialised database.
    pub fn full(db: Database) -> Self {
        Self {
            admin: Some(AdminDatabase::new(db.clone())),
            db: Some(db),
        }
    }

    pub fn read_only(db: Database) -> Self {
        Self {
            db: Some(db),
            admin: None,
        }
    }

    pub fn reader(&self) -> Result<&Database, ServerError> {
        self.db
            .as_ref()
            .ok_or_else(|| ServerError::Unavailable("no store client configured".to_string()))
    }
}
