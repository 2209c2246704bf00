// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Aggregation of batch outcomes into status histograms and latency figures.

use crate::batch::BatchResult;
use crate::executor::RequestOutcome;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Min/avg/max over a set of latencies. Failed requests count too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    #[serde(rename = "min_ms", serialize_with = "as_millis")]
    pub min: Duration,
    #[serde(rename = "avg_ms", serialize_with = "as_millis")]
    pub avg: Duration,
    #[serde(rename = "max_ms", serialize_with = "as_millis")]
    pub max: Duration,
}

impl LatencyStats {
    /// `None` for an empty input.
    pub fn from_latencies<I>(latencies: I) -> Option<Self>
    where
        I: IntoIterator<Item = Duration>,
    {
        let mut count: u32 = 0;
        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for latency in latencies {
            count += 1;
            total += latency;
            min = min.min(latency);
            max = max.max(latency);
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            min,
            avg: total / count,
            max,
        })
    }
}

/// Aggregated view of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Outcome count per status code; 0 is transport failure
    pub histogram: BTreeMap<u16, usize>,
    pub total: usize,
    pub latency: Option<LatencyStats>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Requests per second over the batch span
    pub throughput: Option<f64>,
}

impl AggregateStats {
    pub fn from_batch(batch: &BatchResult) -> Self {
        Self::from_outcomes(&batch.outcomes, batch.elapsed)
    }

    /// Aggregate `outcomes` that took `span` of wall-clock time overall.
    pub fn from_outcomes(outcomes: &[RequestOutcome], span: Duration) -> Self {
        let mut histogram = BTreeMap::new();
        for outcome in outcomes {
            *histogram.entry(outcome.status_code).or_insert(0) += 1;
        }

        let total = outcomes.len();
        let throughput = if span.is_zero() || total == 0 {
            None
        } else {
            Some(total as f64 / span.as_secs_f64())
        };

        Self {
            histogram,
            total,
            latency: LatencyStats::from_latencies(outcomes.iter().map(|o| o.latency)),
            elapsed: span,
            throughput,
        }
    }

    /// Count for one status code.
    pub fn count(&self, status_code: u16) -> usize {
        self.histogram.get(&status_code).copied().unwrap_or(0)
    }

    /// Count across a set of status codes.
    pub fn count_any(&self, status_codes: &[u16]) -> usize {
        status_codes.iter().map(|code| self.count(*code)).sum()
    }

    /// Histogram entries whose status is not in `expected`.
    pub fn unexpected(&self, expected: &[u16]) -> BTreeMap<u16, usize> {
        self.histogram
            .iter()
            .filter(|(code, _)| !expected.contains(code))
            .map(|(code, count)| (*code, *count))
            .collect()
    }
}

/// Every latency observed during a run, for the closing summary.
#[derive(Debug, Clone, Default)]
pub struct LatencyLedger {
    latencies: Vec<Duration>,
}

/// Closing figures across the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub count: usize,
    #[serde(flatten)]
    pub latency: LatencyStats,
}

impl LatencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, latency: Duration) {
        self.latencies.push(latency);
    }

    pub fn record_batch(&mut self, batch: &BatchResult) {
        self.latencies.extend(batch.latencies());
    }

    pub fn len(&self) -> usize {
        self.latencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }

    /// `None` when nothing was recorded.
    pub fn summary(&self) -> Option<LedgerSummary> {
        LatencyStats::from_latencies(self.latencies.iter().copied()).map(|latency| LedgerSummary {
            count: self.latencies.len(),
            latency,
        })
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status_code: u16, millis: u64) -> RequestOutcome {
        RequestOutcome {
            status_code,
            body: String::new(),
            latency: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_histogram_sums_to_batch_size() {
        let outcomes = vec![
            outcome(200, 10),
            outcome(200, 20),
            outcome(429, 5),
            outcome(0, 900),
            outcome(500, 40),
        ];
        let stats = AggregateStats::from_outcomes(&outcomes, Duration::from_secs(1));

        assert_eq!(stats.histogram.values().sum::<usize>(), 5);
        assert_eq!(stats.count(200), 2);
        assert_eq!(stats.count(429), 1);
        assert_eq!(stats.count(0), 1);
        assert_eq!(stats.count(404), 0);
    }

    #[test]
    fn test_failed_requests_are_in_latency_stats() {
        let outcomes = vec![outcome(200, 10), outcome(0, 5000)];
        let stats = AggregateStats::from_outcomes(&outcomes, Duration::from_secs(5));
        let latency = stats.latency.unwrap();

        assert_eq!(latency.min, Duration::from_millis(10));
        assert_eq!(latency.max, Duration::from_millis(5000));
        assert_eq!(latency.avg, Duration::from_millis(2505));
    }

    #[test]
    fn test_throughput_is_size_over_span() {
        let outcomes: Vec<_> = (0..50).map(|_| outcome(200, 100)).collect();
        let stats = AggregateStats::from_outcomes(&outcomes, Duration::from_secs_f64(2.0));

        assert_eq!(stats.throughput, Some(25.0));
    }

    #[test]
    fn test_empty_batch_has_no_latency_or_throughput() {
        let stats = AggregateStats::from_outcomes(&[], Duration::ZERO);
        assert!(stats.latency.is_none());
        assert!(stats.throughput.is_none());
        assert!(stats.histogram.is_empty());
    }

    #[test]
    fn test_unexpected_statuses() {
        let outcomes = vec![outcome(200, 1), outcome(429, 1), outcome(500, 1), outcome(0, 1)];
        let stats = AggregateStats::from_outcomes(&outcomes, Duration::from_secs(1));
        let unexpected = stats.unexpected(&[200, 429]);

        assert_eq!(unexpected.len(), 2);
        assert_eq!(unexpected.get(&500), Some(&1));
        assert_eq!(unexpected.get(&0), Some(&1));
        assert_eq!(stats.count_any(&[200, 429]), 2);
    }

    #[test]
    fn test_ledger_summary() {
        let mut ledger = LatencyLedger::new();
        assert!(ledger.summary().is_none());

        ledger.record(Duration::from_millis(30));
        ledger.record_batch(&BatchResult {
            outcomes: vec![outcome(200, 10), outcome(0, 50)],
            elapsed: Duration::from_millis(50),
            abandoned: 0,
        });

        let summary = ledger.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.latency.min, Duration::from_millis(10));
        assert_eq!(summary.latency.avg, Duration::from_millis(30));
        assert_eq!(summary.latency.max, Duration::from_millis(50));
    }
}
