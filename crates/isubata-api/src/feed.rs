//! Message ingestion and the "what is new since X" feed.
//!
//! Writes go to the database first and are then mirrored into the
//! recent-message cache. Reads are served from the cache, falling back to
//! the database when the cache cannot cover the request.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use isubata_cache::RecentCache;
use isubata_db::Database;
use isubata_db::models::MessageRow;
use isubata_types::api::FeedMessage;
use isubata_types::models::CachedMessage;

use crate::error::ApiError;
use crate::state::run_blocking;

/// Most messages a single feed read returns.
pub const FEED_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub window: usize,
    /// Answer from the database when the cache errors or does not reach back
    /// to the caller's last seen id. Off means cache-only reads.
    pub store_fallback: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            window: FEED_WINDOW,
            store_fallback: true,
        }
    }
}

/// Append a message and mirror it into the cache.
///
/// Once the insert commits the message is durable, so a cache failure
/// afterwards is logged and the call still succeeds.
pub async fn post_message<C: RecentCache>(
    db: &Arc<Database>,
    cache: &C,
    user_id: i64,
    channel_id: i64,
    content: String,
) -> Result<i64, ApiError> {
    if content.is_empty() {
        return Err(ApiError::Validation("message is empty".into()));
    }
    if channel_id <= 0 {
        return Err(ApiError::Validation("channel_id is missing".into()));
    }

    let stored = content.clone();
    let (id, created_at) =
        run_blocking(db, move |db| db.insert_message(channel_id, user_id, &stored)).await?;

    let entry = CachedMessage {
        id,
        user_id,
        created_at,
        content,
    };
    if let Err(e) = cache.push(channel_id, &entry).await {
        warn!("Message {} stored but not cached for channel {}: {}", id, channel_id, e);
    }

    Ok(id)
}

/// Messages in `channel_id` newer than `last_seen`, oldest first, each with
/// its author attached.
///
/// As a side effect the caller's watermark for the channel is set to the
/// highest id returned. When nothing is new that id is 0, so an empty read
/// resets the watermark to 0 regardless of its previous value.
pub async fn read_feed<C: RecentCache>(
    db: &Arc<Database>,
    cache: &C,
    config: &FeedConfig,
    user_id: i64,
    channel_id: i64,
    last_seen: i64,
) -> Result<Vec<FeedMessage>, ApiError> {
    let cached = match cache.range(channel_id, 0, config.window).await {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!("Recent cache read failed for channel {}: {}", channel_id, e);
            None
        }
    };

    let mut fresh: Vec<CachedMessage> = match cached {
        Some(entries) if !config.store_fallback || covers(&entries, config.window, last_seen) => {
            entries.into_iter().filter(|e| e.id > last_seen).collect()
        }
        None if !config.store_fallback => Vec::new(),
        _ => {
            debug!("Feed for channel {} served from the store", channel_id);
            let limit = config.window as i64;
            run_blocking(db, move |db| db.fetch_after(channel_id, last_seen, limit))
                .await?
                .into_iter()
                .map(cached_from_row)
                .collect()
        }
    };

    let new_watermark = fresh.iter().map(|e| e.id).max().unwrap_or(0);
    let author_ids: Vec<i64> = fresh
        .iter()
        .map(|e| e.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let users = run_blocking(db, move |db| {
        let users = db.get_user_summaries(&author_ids)?;
        db.upsert_watermark(user_id, channel_id, new_watermark)?;
        Ok(users)
    })
    .await?;

    fresh.sort_by_key(|e| e.id);
    let messages = fresh
        .into_iter()
        .filter_map(|entry| match users.get(&entry.user_id) {
            Some(user) => Some(FeedMessage {
                id: entry.id,
                user: user.clone(),
                date: entry.date(),
                content: entry.content,
            }),
            None => {
                warn!("Message {} has no author row (user {})", entry.id, entry.user_id);
                None
            }
        })
        .collect();

    Ok(messages)
}

/// Whether a cache read of up to `window` entries saw everything newer than
/// `last_seen`: either it filled the window or it reached an entry the
/// caller has already seen.
fn covers(entries: &[CachedMessage], window: usize, last_seen: i64) -> bool {
    entries.len() >= window || entries.iter().any(|e| e.id <= last_seen)
}

pub(crate) fn cached_from_row(row: MessageRow) -> CachedMessage {
    CachedMessage {
        id: row.id,
        user_id: row.user_id,
        created_at: row.created_at,
        content: row.content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: i64) -> CachedMessage {
        CachedMessage {
            id,
            user_id: 1,
            created_at: NaiveDate::from_ymd_opt(2017, 10, 1)
                .unwrap()
                .and_hms_opt(9, 30, 5)
                .unwrap(),
            content: String::new(),
        }
    }

    #[test]
    fn coverage_needs_full_window_or_an_old_entry() {
        let newest_first: Vec<_> = (6..=10).rev().map(entry).collect();
        assert!(covers(&newest_first, 100, 6));
        assert!(covers(&newest_first, 5, 0));
        assert!(!covers(&newest_first, 100, 5));
        assert!(!covers(&[], 100, 0));
    }

    #[test]
    fn cached_dates_use_display_format() {
        assert_eq!(entry(1).date(), "2017/10/01 09:30:05");
    }
}
