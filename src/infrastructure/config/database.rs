//! Persistence backend selection.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    /// Nothing survives a restart. Dry runs and tests only.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "dealflow.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            path: default_database_path(),
        }
    }
}
