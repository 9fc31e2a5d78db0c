//! In-process stand-in for a Discord webhook endpoint.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct HookState {
    status: StatusCode,
    body: String,
    delay: Duration,
    received: Mutex<Vec<Value>>,
}

/// A webhook that answers every POST with a fixed status and body and
/// records the JSON payloads it was sent.
pub struct FakeWebhook {
    pub url: String,
    state: Arc<HookState>,
    task: JoinHandle<()>,
}

impl FakeWebhook {
    pub async fn start(status: StatusCode, body: &str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: &str, delay: Duration) -> Self {
        let state = Arc::new(HookState {
            status,
            body: body.to_string(),
            delay,
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/webhooks/123/abc", post(hook))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api/webhooks/123/abc"),
            state,
            task,
        }
    }

    /// Payloads received so far, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().unwrap().clone()
    }

    /// Contents of every received payload.
    pub fn contents(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|p| p["content"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Drop for FakeWebhook {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn hook(
    State(state): State<Arc<HookState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, String) {
    state.received.lock().unwrap().push(payload);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body.clone())
}

/// URL on localhost where nothing is listening.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/webhooks/123/abc")
}
