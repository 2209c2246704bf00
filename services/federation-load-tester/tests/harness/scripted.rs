// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scripted transport standing in for the federation server.

use async_trait::async_trait;
use federation_load_tester::{RequestSpec, Transport, TransportError, TransportResponse};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the transport answers for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Fail(TransportError),
    /// Never answers within any sane timeout
    Stall,
}

impl Reply {
    pub fn status(code: u16) -> Self {
        Reply::Status(code, "{}".to_string())
    }

    pub fn health(total_messages: i64) -> Self {
        Reply::Status(
            200,
            json!({
                "status": "healthy",
                "total_messages": total_messages,
                "average_latency_ms": 12
            })
            .to_string(),
        )
    }
}

/// Transport with per-endpoint canned replies and call counting.
pub struct ScriptedTransport {
    health: Reply,
    health_queue: Mutex<VecDeque<Reply>>,
    inbox: Vec<Reply>,
    send: Vec<Reply>,
    delay: Duration,
    calls: AtomicUsize,
    inbox_calls: AtomicUsize,
    send_calls: AtomicUsize,
    by_endpoint: Mutex<HashMap<String, usize>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            health: Reply::health(0),
            health_queue: Mutex::new(VecDeque::new()),
            inbox: vec![Reply::status(200)],
            send: vec![Reply::status(201)],
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            inbox_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            by_endpoint: Mutex::new(HashMap::new()),
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for every health request not covered by a queued reply.
    pub fn with_health(mut self, reply: Reply) -> Self {
        self.health = reply;
        self
    }

    /// Replies handed out to the next health requests, in order.
    pub fn with_health_sequence(self, replies: Vec<Reply>) -> Self {
        *self.health_queue.lock().unwrap() = replies.into();
        self
    }

    /// Inbox replies, cycled through per call.
    pub fn with_inbox(mut self, replies: Vec<Reply>) -> Self {
        self.inbox = replies;
        self
    }

    /// Send replies, cycled through per call.
    pub fn with_send(mut self, replies: Vec<Reply>) -> Self {
        self.send = replies;
        self
    }

    /// Latency added to every answered request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.by_endpoint
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    fn pick(&self, request: &RequestSpec) -> Reply {
        match request.endpoint.as_str() {
            "/federation/health" => self
                .health_queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.health.clone()),
            "/federation/inbox" => {
                let n = self.inbox_calls.fetch_add(1, Ordering::SeqCst);
                self.inbox[n % self.inbox.len()].clone()
            }
            "/federation/send" => {
                let n = self.send_calls.fetch_add(1, Ordering::SeqCst);
                self.send[n % self.send.len()].clone()
            }
            _ => Reply::status(404),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestSpec) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .by_endpoint
            .lock()
            .unwrap()
            .entry(request.endpoint.clone())
            .or_insert(0) += 1;

        match self.pick(request) {
            Reply::Status(status, body) => {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                Ok(TransportResponse { status, body })
            }
            Reply::Fail(err) => Err(err),
            Reply::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Request("stalled".to_string()))
            }
        }
    }

    fn target(&self) -> String {
        "scripted://federation".to_string()
    }
}
