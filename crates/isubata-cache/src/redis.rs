use deadpool_redis::redis::{cmd, pipe};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use tracing::info;

use isubata_types::models::CachedMessage;

use crate::{CacheError, RECENT_CACHE_BOUND, RecentCache, unavailable};

/// Redis-backed cache. Each channel is one list, head = newest, and every
/// element is a JSON-encoded [`CachedMessage`].
pub struct RedisCache {
    pool: Pool,
    bound: usize,
}

impl RedisCache {
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(unavailable)?;
        info!("Recent-message cache: redis at {}", url);
        Ok(Self {
            pool,
            bound: RECENT_CACHE_BOUND,
        })
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(unavailable)
    }
}

fn key(channel_id: i64) -> String {
    format!("isubata:recent:{}", channel_id)
}

impl RecentCache for RedisCache {
    async fn push(&self, channel_id: i64, entry: &CachedMessage) -> Result<(), CacheError> {
        let payload = serde_json::to_string(entry)?;
        let key = key(channel_id);
        let mut conn = self.conn().await?;

        let _: () = pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(&key)
            .arg(payload)
            .ignore()
            .cmd("LTRIM")
            .arg(&key)
            .arg(0)
            .arg(self.bound as i64 - 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn range(
        &self,
        channel_id: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<CachedMessage>, CacheError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let stop = start.saturating_add(count - 1).min(i64::MAX as usize);
        let mut conn = self.conn().await?;

        let raw: Vec<String> = cmd("LRANGE")
            .arg(key(channel_id))
            .arg(start as i64)
            .arg(stop as i64)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        raw.iter()
            .map(|item| serde_json::from_str(item).map_err(CacheError::from))
            .collect()
    }

    async fn bootstrap(&self, channel_id: i64, entries: &[CachedMessage]) -> Result<(), CacheError> {
        let key = key(channel_id);
        let mut p = pipe();
        p.atomic().cmd("DEL").arg(&key).ignore();
        for entry in entries.iter().take(self.bound) {
            p.cmd("RPUSH").arg(&key).arg(serde_json::to_string(entry)?).ignore();
        }

        let mut conn = self.conn().await?;
        let _: () = p.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
