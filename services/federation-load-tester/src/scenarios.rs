// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The four load scenarios and their reports.
//!
//! Every scenario follows the same shape: build the batch, run it, fold
//! the outcomes into [`AggregateStats`] and return a report. Reports
//! render a result section even when every request failed.

use crate::activities;
use crate::batch::BatchRunner;
use crate::config::{ScenarioConfig, ScenarioKind, RETRY_QUEUE_REQUESTS};
use crate::health::{health_request, HealthDelta, HealthSnapshot, HealthUnavailable};
use crate::metrics::{AggregateStats, LatencyLedger};
use crate::report;
use crate::transport::Transport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Status returned by the inbox when a sender is throttled.
pub const RATE_LIMITED: u16 = 429;

/// Statuses the inbox is expected to answer with under load.
pub const INBOX_EXPECTED: &[u16] = &[200, RATE_LIMITED];

/// Statuses meaning the send endpoint accepted the activity.
pub const SEND_ACCEPTED: &[u16] = &[200, 201];

/// Result of the rate-limit burst.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitReport {
    pub stats: AggregateStats,
    pub abandoned: usize,
}

impl RateLimitReport {
    /// At least one request was throttled.
    pub fn limiting_observed(&self) -> bool {
        self.stats.count(RATE_LIMITED) > 0
    }
}

/// Result of the concurrent inbox burst.
#[derive(Debug, Clone, Serialize)]
pub struct ConcurrentInboxReport {
    pub stats: AggregateStats,
    pub abandoned: usize,
}

impl ConcurrentInboxReport {
    pub fn succeeded(&self) -> usize {
        self.stats.count(200)
    }

    pub fn failed(&self) -> usize {
        self.stats.total - self.succeeded()
    }
}

/// Result of the retry-queue simulation.
///
/// Delivery happens out of band, so success only means the server accepted
/// the activity for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct RetryQueueReport {
    pub stats: AggregateStats,
    pub requested: usize,
    pub abandoned: usize,
}

impl RetryQueueReport {
    pub fn accepted(&self) -> usize {
        self.stats.count_any(SEND_ACCEPTED)
    }
}

/// Result of the health monitoring probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthMonitorReport {
    pub load: AggregateStats,
    pub delta: HealthDelta,
    pub abandoned: usize,
}

/// One rendered scenario section.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scenario", rename_all = "kebab-case")]
pub enum ScenarioReport {
    HealthMonitoring(HealthMonitorReport),
    ConcurrentInbox(ConcurrentInboxReport),
    RateLimit(RateLimitReport),
    RetryQueue(RetryQueueReport),
}

impl ScenarioReport {
    pub fn kind(&self) -> ScenarioKind {
        match self {
            Self::HealthMonitoring(_) => ScenarioKind::HealthMonitoring,
            Self::ConcurrentInbox(_) => ScenarioKind::ConcurrentInbox,
            Self::RateLimit(_) => ScenarioKind::RateLimit,
            Self::RetryQueue(_) => ScenarioKind::RetryQueue,
        }
    }

    pub fn abandoned(&self) -> usize {
        match self {
            Self::HealthMonitoring(r) => r.abandoned,
            Self::ConcurrentInbox(r) => r.abandoned,
            Self::RateLimit(r) => r.abandoned,
            Self::RetryQueue(r) => r.abandoned,
        }
    }

    /// Non-fatal findings, repeated in the closing summary.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let unexpected = match self {
            Self::HealthMonitoring(r) => r.load.unexpected(INBOX_EXPECTED),
            Self::ConcurrentInbox(r) => r.stats.unexpected(INBOX_EXPECTED),
            Self::RateLimit(r) => r.stats.unexpected(INBOX_EXPECTED),
            Self::RetryQueue(r) => r.stats.unexpected(SEND_ACCEPTED),
        };
        if !unexpected.is_empty() {
            warnings.push(format!("unexpected statuses: {}", describe_statuses(&unexpected)));
        }

        match self {
            Self::RateLimit(r) if !r.limiting_observed() => {
                warnings.push("Rate limiting may not be enforced".to_string());
            }
            Self::HealthMonitoring(r) if !r.delta.is_available() => {
                warnings.push("Health metrics unavailable".to_string());
            }
            _ => {}
        }

        if self.abandoned() > 0 {
            warnings.push(format!("{} requests abandoned by interrupt", self.abandoned()));
        }

        warnings
    }
}

fn describe_statuses(histogram: &BTreeMap<u16, usize>) -> String {
    histogram
        .iter()
        .map(|(code, count)| match *code {
            0 => format!("transport failure x{count}"),
            code => format!("{code} x{count}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_abandoned(f: &mut fmt::Formatter<'_>, abandoned: usize) -> fmt::Result {
    if abandoned > 0 {
        writeln!(
            f,
            "  {}",
            report::warning(&format!(
                "{abandoned} requests abandoned by interrupt, figures are partial"
            ))
        )?;
    }
    Ok(())
}

impl fmt::Display for RateLimitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", report::heading("Results:"))?;
        if self.stats.histogram.is_empty() {
            writeln!(f, "  no requests completed")?;
        }
        for (status, count) in &self.stats.histogram {
            let line = match *status {
                200 => report::ok(&format!("200 OK: {count} requests")),
                RATE_LIMITED => report::failure(&format!("429 Rate Limited: {count} requests")),
                0 => report::warning(&format!("transport failure: {count} requests")),
                other => report::warning(&format!("{other}: {count} requests")),
            };
            writeln!(f, "  {line}")?;
        }
        write_abandoned(f, self.abandoned)?;
        writeln!(f)?;
        if self.limiting_observed() {
            writeln!(f, "{}", report::ok("Rate limiting is working correctly!"))
        } else {
            writeln!(f, "{}", report::warning("Warning: Rate limiting may not be enforced"))
        }
    }
}

impl fmt::Display for ConcurrentInboxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", report::heading("Results:"))?;
        writeln!(f, "  Total requests: {}", self.stats.total)?;
        writeln!(f, "  Successful: {}", report::good(self.succeeded()))?;
        writeln!(f, "  Failed: {}", report::bad(self.failed()))?;
        writeln!(f, "  Total time: {:.2}s", self.stats.elapsed.as_secs_f64())?;
        writeln!(
            f,
            "  Avg response time: {}",
            report::millis_or_na(self.stats.latency.map(|l| l.avg))
        )?;
        match self.stats.throughput {
            Some(rps) => writeln!(f, "  Throughput: {rps:.2} req/s")?,
            None => writeln!(f, "  Throughput: n/a")?,
        }
        write_abandoned(f, self.abandoned)
    }
}

impl fmt::Display for RetryQueueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", report::heading("Results:"))?;
        writeln!(
            f,
            "  Activities queued: {}/{}",
            report::good(self.accepted()),
            self.requested
        )?;
        let unexpected = self.stats.unexpected(SEND_ACCEPTED);
        if !unexpected.is_empty() {
            writeln!(
                f,
                "  {}",
                report::warning(&format!("Not accepted: {}", describe_statuses(&unexpected)))
            )?;
        }
        write_abandoned(f, self.abandoned)?;
        writeln!(f, "  {} Check server logs for retry attempts", report::heading("Note:"))?;
        writeln!(f, "  {} Retry worker runs every 30 seconds", report::heading("Note:"))
    }
}

impl fmt::Display for HealthMonitorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", report::heading("Health Metrics:"))?;
        match &self.delta {
            HealthDelta::Available {
                message_delta,
                latest_status,
                latest_latency_ms,
                failed_delivery_delta,
                pending_retry_delta,
                rate_limit_violation_delta,
            } => {
                let status = if latest_status.is_empty() { "unknown" } else { latest_status };
                writeln!(f, "  Status: {status}")?;
                writeln!(f, "  Messages processed: {}", report::good(format!("{message_delta:+}")))?;
                writeln!(f, "  Avg latency: {latest_latency_ms}ms")?;
                writeln!(f, "  Failed deliveries: {failed_delivery_delta:+}")?;
                writeln!(f, "  Pending retries: {pending_retry_delta:+}")?;
                writeln!(f, "  Rate limit violations: {rate_limit_violation_delta:+}")?;
            }
            HealthDelta::Unavailable { reason } => {
                writeln!(
                    f,
                    "  {}",
                    report::failure(&format!("Failed to retrieve health metrics ({reason})"))
                )?;
            }
        }
        writeln!(
            f,
            "  Load generated: {} requests, {} accepted",
            self.load.total,
            self.load.count(200)
        )?;
        write_abandoned(f, self.abandoned)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealthMonitoring(r) => r.fmt(f),
            Self::ConcurrentInbox(r) => r.fmt(f),
            Self::RateLimit(r) => r.fmt(f),
            Self::RetryQueue(r) => r.fmt(f),
        }
    }
}

/// Runs scenarios against one [`BatchRunner`], feeding every latency into
/// the run-wide ledger.
pub struct ScenarioRunner<'a, T> {
    runner: &'a BatchRunner<T>,
    config: &'a ScenarioConfig,
    ledger: &'a mut LatencyLedger,
}

impl<'a, T: Transport> ScenarioRunner<'a, T> {
    pub fn new(
        runner: &'a BatchRunner<T>,
        config: &'a ScenarioConfig,
        ledger: &'a mut LatencyLedger,
    ) -> Self {
        Self { runner, config, ledger }
    }

    pub async fn run(&mut self, kind: ScenarioKind) -> ScenarioReport {
        match kind {
            ScenarioKind::HealthMonitoring => ScenarioReport::HealthMonitoring(self.health_monitoring().await),
            ScenarioKind::ConcurrentInbox => ScenarioReport::ConcurrentInbox(self.concurrent_inbox().await),
            ScenarioKind::RateLimit => ScenarioReport::RateLimit(self.rate_limit().await),
            ScenarioKind::RetryQueue => ScenarioReport::RetryQueue(self.retry_queue().await),
        }
    }

    /// Burst the inbox and look for 429s.
    pub async fn rate_limit(&mut self) -> RateLimitReport {
        let count = self.config.rate_limit_requests;
        info!(count, "Sending concurrent requests to the inbox");

        let batch = self.runner.run(activities::rate_limit_burst(count)).await;
        self.ledger.record_batch(&batch);

        let report = RateLimitReport {
            stats: AggregateStats::from_batch(&batch),
            abandoned: batch.abandoned,
        };
        if !report.limiting_observed() {
            warn!(count, "No request was rate limited");
        }
        report
    }

    /// Varied inbox posts, measuring throughput.
    pub async fn concurrent_inbox(&mut self) -> ConcurrentInboxReport {
        let count = self.config.concurrent_requests;
        info!(count, "Sending concurrent valid requests");

        let batch = self.runner.run(activities::varied_posts(count)).await;
        self.ledger.record_batch(&batch);

        let stats = AggregateStats::from_batch(&batch);
        info!(
            succeeded = stats.count(200),
            throughput = stats.throughput.unwrap_or(0.0),
            "Concurrent inbox burst finished"
        );
        ConcurrentInboxReport {
            stats,
            abandoned: batch.abandoned,
        }
    }

    /// Sends to undeliverable targets so they land in the retry queue.
    pub async fn retry_queue(&mut self) -> RetryQueueReport {
        info!(count = RETRY_QUEUE_REQUESTS, "Sending activities to non-existent servers");

        let batch = self
            .runner
            .run(activities::unreachable_follows(RETRY_QUEUE_REQUESTS))
            .await;
        self.ledger.record_batch(&batch);

        RetryQueueReport {
            stats: AggregateStats::from_batch(&batch),
            requested: RETRY_QUEUE_REQUESTS,
            abandoned: batch.abandoned,
        }
    }

    /// Snapshot, load, settle, snapshot.
    pub async fn health_monitoring(&mut self) -> HealthMonitorReport {
        let before = self.snapshot().await;

        let count = self.config.health_load_requests;
        info!(count, "Generating load");
        let batch = self.runner.run(activities::likes(count)).await;
        self.ledger.record_batch(&batch);

        let shutdown = self.runner.shutdown();
        tokio::select! {
            _ = tokio::time::sleep(self.config.settle_duration()) => {}
            _ = shutdown.triggered() => {}
        }

        let after = self.snapshot().await;
        let delta = HealthDelta::diff(&before, &after);
        if let HealthDelta::Unavailable { reason } = &delta {
            warn!(%reason, "Health delta unavailable");
        }

        HealthMonitorReport {
            load: AggregateStats::from_batch(&batch),
            delta,
            abandoned: batch.abandoned,
        }
    }

    async fn snapshot(&mut self) -> Result<HealthSnapshot, HealthUnavailable> {
        let batch = self.runner.run(vec![health_request()]).await;
        self.ledger.record_batch(&batch);

        match batch.outcomes.first() {
            Some(outcome) => HealthSnapshot::from_outcome(outcome),
            None => Err(HealthUnavailable::Interrupted),
        }
    }
}
