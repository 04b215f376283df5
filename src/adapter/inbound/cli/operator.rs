//! Store access for read-only CLI handlers.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::database::DatabaseBackend;
use crate::infrastructure::config::settings::Config;
use crate::port::Store;

/// Open the store named by the config at `path`.
///
/// A SQLite file that does not exist yet is reported as `None` rather than
/// created, so inspecting a fresh install leaves no empty database behind.
///
/// # Errors
///
/// Returns an error if the config is invalid or the database cannot be
/// opened.
pub fn open_store(path: &Path) -> Result<Option<(Config, Arc<dyn Store>)>> {
    let config = Config::load(path)?;
    if config.database.backend == DatabaseBackend::Sqlite
        && !Path::new(&config.database.path).exists()
    {
        return Ok(None);
    }
    let store = bootstrap::build_store(&config)?;
    Ok(Some((config, store)))
}

/// Where the configured store lives, for messages.
#[must_use]
pub fn store_label(config: &Config) -> String {
    match config.database.backend {
        DatabaseBackend::Sqlite => config.database.path.clone(),
        DatabaseBackend::Memory => "memory".to_string(),
    }
}
