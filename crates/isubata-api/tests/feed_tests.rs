//! Feed assembly, unread counting and reset, driven below the HTTP layer.

mod common;

use isubata_api::admin;
use isubata_api::feed::{self, FeedConfig};
use isubata_api::unread::unread_count;
use isubata_cache::{CacheError, MemoryCache, RECENT_CACHE_BOUND, RecentCache};
use isubata_db::models::ResetBaseline;
use isubata_types::models::CachedMessage;

use common::TestApp;

/// A cache whose every call fails, standing in for an unreachable server.
struct DownCache;

impl RecentCache for DownCache {
    async fn push(&self, _: i64, _: &CachedMessage) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn range(&self, _: i64, _: usize, _: usize) -> Result<Vec<CachedMessage>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn bootstrap(&self, _: i64, _: &[CachedMessage]) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

async fn seed_user(app: &TestApp, name: &str) -> i64 {
    let name = name.to_string();
    app.state
        .db
        .create_user(&name, "hash", &name, "default.png")
        .unwrap()
        .unwrap()
}

async fn post_n(app: &TestApp, user_id: i64, channel_id: i64, n: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let id = feed::post_message(
            &app.state.db,
            &app.state.cache,
            user_id,
            channel_id,
            format!("message {}", i),
        )
        .await
        .unwrap();
        ids.push(id);
    }
    ids
}

#[tokio::test]
async fn ids_are_globally_monotonic() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;

    let mut last = 0;
    for channel in [1, 2, 3, 1, 2, 3] {
        let id = feed::post_message(&app.state.db, &app.state.cache, alice, channel, "hi".into())
            .await
            .unwrap();
        assert!(id > last);
        last = id;
    }
}

#[tokio::test]
async fn feed_returns_only_newer_messages_in_ascending_order() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let ids = post_n(&app, alice, 1, 10).await;

    let messages = feed::read_feed(
        &app.state.db,
        &app.state.cache,
        &FeedConfig::default(),
        alice,
        1,
        ids[4],
    )
    .await
    .unwrap();

    let got: Vec<i64> = messages.iter().map(|m| m.id).collect();
    assert_eq!(got, ids[5..]);
    assert_eq!(messages[0].user.name, "alice");
    assert_eq!(app.state.db.get_watermark(alice, 1).unwrap(), Some(ids[9]));
}

#[tokio::test]
async fn empty_read_overwrites_watermark_with_zero() {
    // An empty read stores 0 even when the caller had already read
    // everything.
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let ids = post_n(&app, alice, 1, 10).await;
    app.state.db.upsert_watermark(alice, 1, ids[9]).unwrap();

    let messages = feed::read_feed(
        &app.state.db,
        &app.state.cache,
        &FeedConfig::default(),
        alice,
        1,
        ids[9],
    )
    .await
    .unwrap();

    assert!(messages.is_empty());
    assert_eq!(app.state.db.get_watermark(alice, 1).unwrap(), Some(0));
}

#[tokio::test]
async fn cached_entries_mirror_the_store() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let bob = seed_user(&app, "bob").await;
    post_n(&app, alice, 1, 5).await;
    post_n(&app, bob, 1, 5).await;
    post_n(&app, bob, 2, 3).await;

    for channel in [1, 2] {
        let stored = app.state.db.fetch_page(channel, 1000, 0).unwrap();
        let cached = app.memory_cache().range(channel, 0, usize::MAX).await.unwrap();
        assert_eq!(cached.len(), stored.len());
        for (c, s) in cached.iter().zip(&stored) {
            assert_eq!((c.id, c.user_id, c.content.as_str()), (s.id, s.user_id, s.content.as_str()));
        }
    }
}

#[tokio::test]
async fn cache_stays_within_bound() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let ids = post_n(&app, alice, 1, RECENT_CACHE_BOUND + 5).await;

    assert_eq!(app.memory_cache().len(1), RECENT_CACHE_BOUND);
    let head = app.memory_cache().range(1, 0, 1).await.unwrap();
    assert_eq!(head[0].id, *ids.last().unwrap());
}

#[tokio::test]
async fn feed_window_caps_the_result() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let ids = post_n(&app, alice, 1, 120).await;

    let messages = feed::read_feed(
        &app.state.db,
        &app.state.cache,
        &FeedConfig::default(),
        alice,
        1,
        0,
    )
    .await
    .unwrap();

    assert_eq!(messages.len(), 100);
    assert_eq!(messages.first().unwrap().id, ids[20]);
    assert_eq!(messages.last().unwrap().id, ids[119]);
}

#[tokio::test]
async fn cache_failure_does_not_fail_the_write() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;

    let id = feed::post_message(&app.state.db, &DownCache, alice, 1, "durable".into())
        .await
        .unwrap();

    let stored = app.state.db.fetch_page(1, 10, 0).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);

    // Reads fall back to the store while the cache is down.
    let messages = feed::read_feed(&app.state.db, &DownCache, &FeedConfig::default(), alice, 1, 0)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "durable");
}

#[tokio::test]
async fn cache_gap_is_filled_from_store_unless_disabled() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let ids = post_n(&app, alice, 1, 4).await;
    let cold = MemoryCache::new();

    let with_fallback = feed::read_feed(&app.state.db, &cold, &FeedConfig::default(), alice, 1, ids[0])
        .await
        .unwrap();
    assert_eq!(with_fallback.iter().map(|m| m.id).collect::<Vec<_>>(), ids[1..]);

    let cache_only = FeedConfig {
        store_fallback: false,
        ..FeedConfig::default()
    };
    let without = feed::read_feed(&app.state.db, &cold, &cache_only, alice, 1, ids[0])
        .await
        .unwrap();
    assert!(without.is_empty());
    assert_eq!(app.state.db.get_watermark(alice, 1).unwrap(), Some(0));
}

#[tokio::test]
async fn unread_count_uses_watermark_or_full_count() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let bob = seed_user(&app, "bob").await;
    let ids = post_n(&app, alice, 1, 10).await;
    app.state.db.upsert_watermark(alice, 1, ids[4]).unwrap();

    assert_eq!(unread_count(&app.state.db, alice, 1).unwrap(), 5);
    assert_eq!(unread_count(&app.state.db, bob, 1).unwrap(), 10);
    assert_eq!(unread_count(&app.state.db, bob, 2).unwrap(), 0);
}

#[tokio::test]
async fn reset_rebuilds_cache_from_store() {
    let app = TestApp::new().await;
    let alice = seed_user(&app, "alice").await;
    let general = app.state.db.create_channel("general", "d").unwrap();
    let ids = post_n(&app, alice, general, 150).await;
    app.state.db.upsert_watermark(alice, general, ids[10]).unwrap();

    let baseline = ResetBaseline {
        max_user_id: alice,
        max_image_id: 0,
        max_channel_id: general,
        max_message_id: ids[119],
    };
    app.memory_cache().flush().await.unwrap();
    admin::reset(&app.state.db, &app.state.cache, baseline).await.unwrap();

    let cached = app.memory_cache().range(general, 0, usize::MAX).await.unwrap();
    assert_eq!(cached.len(), 100);
    assert_eq!(cached[0].id, ids[119]);
    assert_eq!(cached[99].id, ids[20]);
    assert_eq!(app.state.db.get_watermark(alice, general).unwrap(), None);
}
