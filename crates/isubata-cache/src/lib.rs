//! Per-channel cache of the most recent messages.
//!
//! Each channel keeps a bounded list with the newest message at the head.
//! The list is advisory: every entry also lives in the database, and the
//! whole cache may be flushed and rebuilt at any time.

pub mod memory;
pub mod redis;

use std::future::Future;

use isubata_types::models::CachedMessage;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Number of entries retained per channel after every push.
pub const RECENT_CACHE_BOUND: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache entry encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub(crate) fn unavailable(e: impl std::fmt::Display) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

pub trait RecentCache: Send + Sync {
    /// Put `entry` at the head of the channel's list, then trim the list to
    /// the bound.
    fn push(
        &self,
        channel_id: i64,
        entry: &CachedMessage,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Up to `count` entries starting `start` places from the head, newest
    /// first.
    fn range(
        &self,
        channel_id: i64,
        start: usize,
        count: usize,
    ) -> impl Future<Output = Result<Vec<CachedMessage>, CacheError>> + Send;

    /// Replace the channel's list with `entries`, given newest first. Each
    /// entry is appended at the tail in turn so the head ends up holding the
    /// newest one, the same shape `push` maintains.
    fn bootstrap(
        &self,
        channel_id: i64,
        entries: &[CachedMessage],
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Drop every channel's list.
    fn flush(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// The backend picked at startup.
pub enum CacheBackend {
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl RecentCache for CacheBackend {
    async fn push(&self, channel_id: i64, entry: &CachedMessage) -> Result<(), CacheError> {
        match self {
            Self::Memory(c) => c.push(channel_id, entry).await,
            Self::Redis(c) => c.push(channel_id, entry).await,
        }
    }

    async fn range(
        &self,
        channel_id: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<CachedMessage>, CacheError> {
        match self {
            Self::Memory(c) => c.range(channel_id, start, count).await,
            Self::Redis(c) => c.range(channel_id, start, count).await,
        }
    }

    async fn bootstrap(&self, channel_id: i64, entries: &[CachedMessage]) -> Result<(), CacheError> {
        match self {
            Self::Memory(c) => c.bootstrap(channel_id, entries).await,
            Self::Redis(c) => c.bootstrap(channel_id, entries).await,
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        match self {
            Self::Memory(c) => c.flush().await,
            Self::Redis(c) => c.flush().await,
        }
    }
}
