#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use isubata_api::feed::FeedConfig;
use isubata_api::icons::IconStore;
use isubata_api::routes::build_router;
use isubata_api::{AppState, AppStateInner};
use isubata_cache::{CacheBackend, MemoryCache};
use isubata_db::Database;
use isubata_db::models::ResetBaseline;

/// A router over a throwaway database and icon directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    root: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_baseline(ResetBaseline::default()).await
    }

    pub async fn with_baseline(reset_baseline: ResetBaseline) -> Self {
        let root = std::env::temp_dir().join(format!("isubata-api-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();

        let db = Arc::new(Database::open(&root.join("test.db")).unwrap());
        let icons = IconStore::new(root.join("icons")).await.unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db,
            cache: CacheBackend::Memory(MemoryCache::new()),
            icons,
            jwt_secret: "test-secret".into(),
            feed: FeedConfig::default(),
            unread_delay: Duration::ZERO,
            reset_baseline,
        });

        Self {
            router: build_router(state.clone()),
            state,
            root,
        }
    }

    pub fn memory_cache(&self) -> &MemoryCache {
        match &self.state.cache {
            CacheBackend::Memory(cache) => cache,
            CacheBackend::Redis(_) => panic!("test app always uses the memory cache"),
        }
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (status, body_json)
    }

    /// Register `name` (password "password") and return (user_id, token).
    pub async fn register(&self, name: &str) -> (i64, String) {
        let (status, body) = self
            .json(
                "POST",
                "/register",
                Some(serde_json::json!({ "name": name, "password": "password" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, body);
        (
            body["user_id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_channel(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                "/channels",
                Some(serde_json::json!({ "name": name, "description": "test channel" })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    pub async fn post(&self, token: &str, channel_id: i64, message: &str) -> StatusCode {
        self.json(
            "POST",
            "/message",
            Some(serde_json::json!({ "channel_id": channel_id, "message": message })),
            Some(token),
        )
        .await
        .0
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
