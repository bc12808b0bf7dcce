use axum::{Extension, Json, extract::State, response::IntoResponse};

use isubata_db::Database;
use isubata_types::api::{Claims, UnreadCount};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Messages in `channel_id` the user has not read yet. Without a watermark
/// row every message in the channel counts.
///
/// Always answered by the database: the recent cache is bounded and could
/// undercount a long backlog.
pub fn unread_count(db: &Database, user_id: i64, channel_id: i64) -> anyhow::Result<i64> {
    match db.get_watermark(user_id, channel_id)? {
        Some(last_read) => db.count_messages_after(channel_id, last_read),
        None => db.count_messages(channel_id),
    }
}

/// GET /fetch: unread counts for every channel.
pub async fn fetch_unread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.unread_delay.is_zero() {
        tokio::time::sleep(state.unread_delay).await;
    }

    let user_id = claims.sub;
    let counts = run_blocking(&state.db, move |db| {
        db.list_channels()?
            .into_iter()
            .map(|channel| -> anyhow::Result<UnreadCount> {
                Ok(UnreadCount {
                    channel_id: channel.id,
                    unread: unread_count(db, user_id, channel.id)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(counts))
}
