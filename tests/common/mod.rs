//! Shared fixtures for integration tests: a recording store and request bodies.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Local;
use scoring_api::auth::{admin_token, user_token};
use scoring_api::store::{ScoreQuery, Store};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const ACCOUNT: &str = "horns&hoofs";
pub const LOGIN: &str = "h&f";

/// Store double that records every call.
pub struct RecordingStore {
    pub score: f64,
    pub fail: bool,
    pub delay: Option<Duration>,
    score_calls: AtomicUsize,
    interest_calls: Mutex<Vec<i64>>,
}

impl RecordingStore {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            fail: false,
            delay: None,
            score_calls: AtomicUsize::new(0),
            interest_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0.0)
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(0.0)
        }
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    pub fn interest_calls(&self) -> Vec<i64> {
        self.interest_calls.lock().unwrap().clone()
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn get_score(&self, _query: &ScoreQuery<'_>) -> anyhow::Result<f64> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail {
            anyhow::bail!("score backend unavailable");
        }
        Ok(self.score)
    }

    async fn get_interests(&self, client_id: i64) -> anyhow::Result<Vec<String>> {
        self.interest_calls.lock().unwrap().push(client_id);
        self.wait().await;
        if self.fail {
            anyhow::bail!("interests backend unavailable");
        }
        Ok(vec!["cars".to_string(), format!("client-{}", client_id)])
    }
}

pub fn admin_body(method: &str, arguments: Value) -> Map<String, Value> {
    object(json!({
        "account": ACCOUNT,
        "login": "admin",
        "token": admin_token(Local::now().naive_local()),
        "arguments": arguments,
        "method": method,
    }))
}

pub fn user_body(method: &str, arguments: Value) -> Map<String, Value> {
    object(json!({
        "account": ACCOUNT,
        "login": LOGIN,
        "token": user_token(ACCOUNT, LOGIN),
        "arguments": arguments,
        "method": method,
    }))
}

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("JSON object")
}
