//! Shared application state.

use std::sync::Arc;

use monitor::{MonitorConfig, MonitorContext, MonitorError};
use tokio::sync::Mutex;

use crate::auth::Credentials;
use crate::error::ApiError;

pub(crate) struct AppState {
    pub(crate) config: MonitorConfig,
    pub(crate) credentials: Credentials,
    /// Held by every blocking monitor job until the job itself returns, so
    /// one process never interleaves two rewrites of the same flat file.
    io_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub(crate) fn new(config: MonitorConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            io_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs blocking monitor work on the blocking pool with a fresh context.
    ///
    /// The lock guard moves into the blocking task: a dropped request future
    /// (client gone) does not release it while the work is still running.
    pub(crate) async fn with_monitor<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&MonitorContext) -> Result<T, MonitorError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.io_lock).lock_owned().await;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let context = MonitorContext::from_config(&config)?;
            work(&context)
        })
        .await
        .map_err(|err| ApiError::internal(format!("monitor task failed: {err}")))?
        .map_err(ApiError::from)
    }
}
