use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use isubata_types::models::CachedMessage;

use crate::{CacheError, RECENT_CACHE_BOUND, RecentCache, unavailable};

/// In-process cache for single-node deployments and tests.
pub struct MemoryCache {
    bound: usize,
    channels: Mutex<HashMap<i64, VecDeque<CachedMessage>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_bound(RECENT_CACHE_BOUND)
    }

    pub fn with_bound(bound: usize) -> Self {
        Self {
            bound,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Current list length for a channel.
    pub fn len(&self, channel_id: i64) -> usize {
        self.channels
            .lock()
            .map(|channels| channels.get(&channel_id).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentCache for MemoryCache {
    async fn push(&self, channel_id: i64, entry: &CachedMessage) -> Result<(), CacheError> {
        let mut channels = self.channels.lock().map_err(unavailable)?;
        let list = channels.entry(channel_id).or_default();
        list.push_front(entry.clone());
        list.truncate(self.bound);
        Ok(())
    }

    async fn range(
        &self,
        channel_id: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<CachedMessage>, CacheError> {
        let channels = self.channels.lock().map_err(unavailable)?;
        Ok(channels
            .get(&channel_id)
            .map(|list| list.iter().skip(start).take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn bootstrap(&self, channel_id: i64, entries: &[CachedMessage]) -> Result<(), CacheError> {
        let mut list = VecDeque::with_capacity(entries.len().min(self.bound));
        for entry in entries.iter().take(self.bound) {
            list.push_back(entry.clone());
        }
        self.channels
            .lock()
            .map_err(unavailable)?
            .insert(channel_id, list);
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.channels.lock().map_err(unavailable)?.clear();
        Ok(())
    }
}
