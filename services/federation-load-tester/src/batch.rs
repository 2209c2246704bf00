// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Concurrent batch dispatch.
//!
//! A batch spawns one task per request on a [`JoinSet`] and returns only
//! once every task has finished. Outcomes are owned by their task until
//! the join, so nothing is shared between in-flight requests.

use crate::executor::{RequestExecutor, RequestOutcome};
use crate::transport::{RequestSpec, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

/// User interrupt signal shared between the suite and its batches.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|fired| *fired).await.is_err() {
            // Sender lives as long as any clone of self.
            std::future::pending::<()>().await;
        }
    }
}

/// All outcomes of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// One per completed request, in completion order
    pub outcomes: Vec<RequestOutcome>,
    /// From first dispatch until the last outcome arrived
    pub elapsed: Duration,
    /// Requests dropped by an interrupt before they finished
    pub abandoned: usize,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of requests that were dispatched.
    pub fn requested(&self) -> usize {
        self.outcomes.len() + self.abandoned
    }

    /// False when an interrupt cut the batch short.
    pub fn is_complete(&self) -> bool {
        self.abandoned == 0
    }

    pub fn count_status(&self, status_code: u16) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status_code == status_code)
            .count()
    }

    pub fn count_matching(&self, accepted: &[u16]) -> usize {
        self.outcomes
            .iter()
            .filter(|o| accepted.contains(&o.status_code))
            .count()
    }

    pub fn latencies(&self) -> impl Iterator<Item = Duration> + '_ {
        self.outcomes.iter().map(|o| o.latency)
    }
}

/// Fans a batch of requests out concurrently and joins them.
pub struct BatchRunner<T> {
    executor: RequestExecutor<T>,
    shutdown: Shutdown,
}

impl<T: Transport> BatchRunner<T> {
    pub fn new(executor: RequestExecutor<T>, shutdown: Shutdown) -> Self {
        Self { executor, shutdown }
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Dispatch every request at once and wait for all of them.
    pub async fn run(&self, requests: Vec<RequestSpec>) -> BatchResult {
        let requested = requests.len();
        let mut tasks = JoinSet::new();
        let mut result = BatchResult {
            outcomes: Vec::with_capacity(requested),
            ..Default::default()
        };

        let start = Instant::now();
        for request in requests {
            let executor = self.executor.clone();
            tasks.spawn(async move { executor.execute(&request).await });
        }
        debug!(requested, "batch dispatched");

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(joined) => collect(joined, &mut result, start),
                    None => break,
                },
                _ = self.shutdown.triggered() => {
                    warn!(in_flight = tasks.len(), "Interrupt received, abandoning in-flight requests");
                    tasks.abort_all();
                    while let Some(joined) = tasks.join_next().await {
                        collect(joined, &mut result, start);
                    }
                    break;
                }
            }
        }

        result.elapsed = start.elapsed();
        debug!(
            requested,
            completed = result.len(),
            abandoned = result.abandoned,
            elapsed = ?result.elapsed,
            "batch joined"
        );
        result
    }
}

fn collect(joined: Result<RequestOutcome, JoinError>, result: &mut BatchResult, start: Instant) {
    match joined {
        Ok(outcome) => result.outcomes.push(outcome),
        Err(err) if err.is_cancelled() => result.abandoned += 1,
        Err(err) => {
            // A panicking task still consumed a request slot.
            warn!(error = %err, "request task failed");
            result.outcomes.push(RequestOutcome::transport_failure(
                format!("request task failed: {err}"),
                start.elapsed(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportError, TransportResponse};
    use async_trait::async_trait;
    use serde_json::json;

    struct DelayTransport {
        delay: Duration,
    }

    #[async_trait]
    impl Transport for DelayTransport {
        async fn send(&self, _request: &RequestSpec) -> std::result::Result<TransportResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(TransportResponse { status: 200, body: "{}".to_string() })
        }

        fn target(&self) -> String {
            "delay".to_string()
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl Transport for PanickingTransport {
        async fn send(&self, request: &RequestSpec) -> std::result::Result<TransportResponse, TransportError> {
            if request.endpoint == "/boom" {
                panic!("transport exploded");
            }
            Ok(TransportResponse { status: 200, body: String::new() })
        }

        fn target(&self) -> String {
            "panicking".to_string()
        }
    }

    fn runner<T: Transport>(transport: T, timeout: Duration, shutdown: Shutdown) -> BatchRunner<T> {
        BatchRunner::new(RequestExecutor::new(Arc::new(transport), timeout), shutdown)
    }

    fn inbox_requests(n: usize) -> Vec<RequestSpec> {
        (0..n)
            .map(|i| RequestSpec::post("/federation/inbox", json!({ "actor": format!("user_{i}") })))
            .collect()
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let delay = Duration::from_millis(200);
        let batch = runner(DelayTransport { delay }, Duration::from_secs(5), Shutdown::new());

        let result = batch.run(inbox_requests(40)).await;

        assert_eq!(result.len(), 40);
        assert!(result.is_complete());
        // Serialized dispatch would need 40 * 200ms.
        assert!(result.elapsed < Duration::from_secs(4), "elapsed {:?}", result.elapsed);
        assert!(result.elapsed >= delay);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = runner(DelayTransport { delay: Duration::ZERO }, Duration::from_secs(1), Shutdown::new());
        let result = batch.run(Vec::new()).await;
        assert!(result.is_empty());
        assert_eq!(result.requested(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_yields_an_outcome() {
        let batch = runner(PanickingTransport, Duration::from_secs(1), Shutdown::new());
        let mut requests = inbox_requests(4);
        requests.push(RequestSpec::get("/boom"));

        let result = batch.run(requests).await;

        assert_eq!(result.len(), 5);
        assert_eq!(result.count_status(200), 4);
        assert_eq!(result.count_status(0), 1);
    }

    #[tokio::test]
    async fn test_interrupt_abandons_in_flight_requests() {
        let shutdown = Shutdown::new();
        let batch = runner(
            DelayTransport { delay: Duration::from_secs(30) },
            Duration::from_secs(60),
            shutdown.clone(),
        );

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let result = batch.run(inbox_requests(8)).await;

        assert!(shutdown.is_triggered());
        assert!(!result.is_complete());
        assert_eq!(result.abandoned, 8);
        assert_eq!(result.requested(), 8);
        assert!(result.elapsed < Duration::from_secs(30));
    }
}
