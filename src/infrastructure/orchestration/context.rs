//! Wired services shared by every loop.

use std::sync::Arc;

use chrono::Duration;

use crate::application::{
    AccountMaintenance, AccountRegistry, AdminService, TransactionLifecycle, WorkerPool,
};
use crate::infrastructure::config::schedule::ScheduleConfig;
use crate::infrastructure::config::workers::RetryConfig;

/// Everything the loops need, built once by the bootstrap.
pub struct Engine {
    pub lifecycle: Arc<TransactionLifecycle>,
    pub maintenance: Arc<AccountMaintenance>,
    pub accounts: Arc<AccountRegistry>,
    pub admin: Arc<AdminService>,
    pub pool: WorkerPool,
    pub schedule: ScheduleConfig,
    pub retry: RetryConfig,
    /// Session age after which an account logs in again.
    pub session_max_age: Duration,
    /// Balance age after which it is fetched again.
    pub balance_max_age: Duration,
}
