use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::receptionist::Receptionist;
use crate::services::telephony::TelephonyProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub receptionist: Receptionist,
    pub telephony: Box<dyn TelephonyProvider>,
}

impl AppState {
    /// Locks the shared connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }
}
