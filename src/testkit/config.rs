//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use crate::infrastructure::config::database::DatabaseBackend;
use crate::infrastructure::config::settings::Config;

/// Payee phone sent in payment details.
pub const PAYEE_PHONE: &str = "+79990001122";

const TEST_CONFIG: &str = r#"
dry_run = true

[database]
backend = "memory"

[workers]
pool_size = 4

[rate_limit]
requests_per_window = 10000
window_secs = 1

[retry]
initial_delay_ms = 1
max_delay_ms = 10
backoff_multiplier = 1.0

[negotiation]
payment_phone = "+79990001122"
receipt_email = "receipts@example.com"

[[accounts]]
id = "gate-1"
kind = "gate"
login = "gate-user"
secret = "gate-secret"

[[accounts]]
id = "bybit-1"
kind = "bybit"
login = "bybit-user"
secret = "bybit-secret"
ad_limit = 2
"#;

/// One Gate source account, one Bybit advertising account with two ad
/// slots, an in-memory store and no receipt spool.
pub fn engine() -> Config {
    let mut config = Config::parse_toml(TEST_CONFIG).expect("test config parses");
    config.receipts.spool_dir = None;
    config
}

/// Same as [`engine`], persisted to the SQLite file at `path`.
pub fn sqlite(path: &std::path::Path) -> Config {
    let mut config = engine();
    config.database.backend = DatabaseBackend::Sqlite;
    config.database.path = path.display().to_string();
    config
}
