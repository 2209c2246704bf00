// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Minimal federation server for HTTP-level tests.
//!
//! The inbox accepts the first `inbox_limit` posts and answers 429 after
//! that. Health reports the number of accepted posts as `total_messages`.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Counters shared by the handlers.
#[derive(Debug, Default)]
pub struct SutState {
    pub inbox_limit: usize,
    pub inbox_seen: AtomicUsize,
    pub total_messages: AtomicI64,
    pub rate_limit_violations: AtomicI64,
    pub pending_retries: AtomicI64,
    pub health_calls: AtomicUsize,
}

/// A running server and its state.
pub struct MockSut {
    pub addr: SocketAddr,
    pub state: Arc<SutState>,
}

impl MockSut {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Bind on an ephemeral port and serve in the background.
pub async fn spawn(inbox_limit: usize) -> MockSut {
    let state = Arc::new(SutState {
        inbox_limit,
        ..Default::default()
    });

    let app = Router::new()
        .route("/federation/health", get(health))
        .route("/federation/inbox", post(inbox))
        .route("/federation/send", post(send))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockSut { addr, state }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn health(State(state): State<Arc<SutState>>) -> Json<Value> {
    state.health_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "status": "healthy",
        "total_messages": state.total_messages.load(Ordering::SeqCst),
        "average_latency_ms": 4,
        "pending_retries": state.pending_retries.load(Ordering::SeqCst),
        "rate_limit_violations": state.rate_limit_violations.load(Ordering::SeqCst)
    }))
}

async fn inbox(
    State(state): State<Arc<SutState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    for field in ["activity_type", "actor", "actor_server"] {
        if body.get(field).and_then(Value::as_str).is_none() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "missing_fields"})),
            );
        }
    }

    let seen = state.inbox_seen.fetch_add(1, Ordering::SeqCst);
    if seen >= state.inbox_limit {
        state.rate_limit_violations.fetch_add(1, Ordering::SeqCst);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate_limit"})),
        );
    }

    state.total_messages.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({"message": "Activity received"})))
}

async fn send(
    State(state): State<Arc<SutState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    for field in ["activity_type", "actor_id", "target_server"] {
        if body.get(field).and_then(Value::as_str).is_none() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "missing_fields"})),
            );
        }
    }

    state.pending_retries.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(json!({"message": "Activity queued for delivery"})),
    )
}

/// An address that accepts connections and never answers.
pub async fn silent_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}
