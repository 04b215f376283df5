//! Default file locations.
//!
//! Everything lives under `~/.dealflow/`:
//! - `~/.dealflow/config.toml` - main configuration
//! - `~/.dealflow/receipts/` - receipt spool written by the OCR side

use std::path::PathBuf;

/// Returns the dealflow home directory (`~/.dealflow/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dealflow")
}

pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

pub fn default_spool() -> PathBuf {
    home_dir().join("receipts")
}
