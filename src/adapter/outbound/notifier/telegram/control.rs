//! Telegram command execution against the admin port.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::port::AdminPort;

mod dispatch;
mod mutate;
mod render;

/// Runtime command executor for Telegram control commands.
#[derive(Clone)]
pub struct TelegramControl {
    admin: Arc<dyn AdminPort>,
    started_at: DateTime<Utc>,
    /// Maximum transactions to display in `/transactions`.
    list_limit: usize,
}

/// Default transaction display limit if not specified.
const DEFAULT_LIST_LIMIT: usize = 10;
