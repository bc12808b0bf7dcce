use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use isubata_cache::CacheBackend;
use isubata_db::Database;
use isubata_db::models::ResetBaseline;

use crate::error::ApiError;
use crate::feed::FeedConfig;
use crate::icons::IconStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub cache: CacheBackend,
    pub icons: IconStore,
    pub jwt_secret: String,
    pub feed: FeedConfig,
    /// Pause before answering an unread poll, to throttle polling clients.
    pub unread_delay: Duration,
    pub reset_baseline: ResetBaseline,
}

/// Run a blocking store call off the async runtime.
pub async fn run_blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("worker task failed".into())
        })?
        .map_err(ApiError::from)
}
