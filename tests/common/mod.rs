#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use bailiff::app::moderation::ModerationService;
use bailiff::app::notifications::NotificationService;
use bailiff::domain::notification::DirectMessage;
use bailiff::domain::user::{Member, RecordCollection};
use bailiff::http::{self, ADMIN_TOKEN_HEADER};
use bailiff::infra::notifier::Notifier;
use bailiff::infra::storage::RecordPersistence;
use bailiff::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

// ---------------------------------------------------------------------------
// In-memory persistence that counts saves
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    last_saved: Mutex<Option<RecordCollection>>,
}

impl MemoryStore {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<RecordCollection> {
        self.last_saved.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordPersistence for MemoryStore {
    async fn load(&self) -> Result<RecordCollection> {
        Ok(self.last_saved().unwrap_or_default())
    }

    async fn save(&self, records: &RecordCollection) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.last_saved.lock().unwrap() = Some(records.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier that records deliveries, optionally refusing some recipients
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(u64, String)>>,
    refuse: Mutex<Vec<u64>>,
}

impl RecordingNotifier {
    pub fn refuse(&self, user_id: u64) {
        self.refuse.lock().unwrap().push(user_id);
    }

    pub fn delivered(&self) -> Vec<(u64, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn try_send_message(&self, recipient: &Member, text: &str) -> Result<()> {
        if self.refuse.lock().unwrap().contains(&recipient.id) {
            return Err(anyhow!("user {} has direct messages disabled", recipient.id));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((recipient.id, text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service harness with an inspectable notification queue
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: ModerationService,
    pub store: Arc<MemoryStore>,
    outbox: mpsc::Receiver<DirectMessage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_records(RecordCollection::new())
    }

    pub fn with_records(records: RecordCollection) -> Self {
        let store = Arc::new(MemoryStore::default());
        let (tx, outbox) = mpsc::channel(64);
        let service = ModerationService::new(records, store.clone(), NotificationService::new(tx))
            .expect("records have a usable id counter");
        Self {
            service,
            store,
            outbox,
        }
    }

    /// Messages enqueued so far. Enqueueing happens before the add call returns.
    pub fn queued_messages(&mut self) -> Vec<DirectMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbox.try_recv() {
            messages.push(message);
        }
        messages
    }
}

pub fn member(id: u64) -> Member {
    Member::new(id, format!("user-{}", id))
}

// ---------------------------------------------------------------------------
// HTTP harness
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub harness: Harness,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_admin_token(Some(TEST_ADMIN_TOKEN))
    }

    pub fn with_admin_token(admin_token: Option<&str>) -> Self {
        let harness = Harness::new();
        let state = AppState {
            moderation: harness.service.clone(),
            admin_token: admin_token.map(str::to_string),
        };
        Self {
            router: http::router(state),
            harness,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, Some(TEST_ADMIN_TOKEN)).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), Some(TEST_ADMIN_TOKEN))
            .await
    }

    pub async fn patch_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(body), Some(TEST_ADMIN_TOKEN))
            .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, Some(TEST_ADMIN_TOKEN))
            .await
    }
}
