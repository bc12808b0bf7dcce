use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use isubata_cache::RecentCache;
use isubata_db::Database;
use isubata_db::models::ResetBaseline;

use crate::error::ApiError;
use crate::feed::cached_from_row;
use crate::state::{AppState, run_blocking};

/// Messages per channel loaded back into the cache after a reset.
pub const BOOTSTRAP_WINDOW: i64 = 100;

/// Truncate the store back to its baseline, then rebuild the recent cache
/// from what is left.
pub async fn reset<C: RecentCache>(
    db: &Arc<Database>,
    cache: &C,
    baseline: ResetBaseline,
) -> Result<(), ApiError> {
    let latest = run_blocking(db, move |db| {
        db.reset(&baseline)?;
        db.list_channels()?
            .into_iter()
            .map(|channel| -> anyhow::Result<_> {
                Ok((channel.id, db.fetch_page(channel.id, BOOTSTRAP_WINDOW, 0)?))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    cache.flush().await?;
    for (channel_id, rows) in latest {
        let entries: Vec<_> = rows.into_iter().map(cached_from_row).collect();
        cache.bootstrap(channel_id, &entries).await?;
    }

    info!("Reset complete; recent cache rebuilt");
    Ok(())
}

/// GET /initialize
pub async fn initialize(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    reset(&state.db, &state.cache, state.reset_baseline).await?;
    Ok(StatusCode::NO_CONTENT)
}
