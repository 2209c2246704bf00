// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the federation load tester.
//!
//! Defaults match the load profile the federation service is tuned
//! against: 150 requests to trip the inbox rate limiter, 50 for the
//! throughput probe and 100 for the health probe.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Number of send requests issued by the retry-queue probe.
pub const RETRY_QUEUE_REQUESTS: usize = 10;

/// Configuration for a load test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the federation server (default: http://localhost:8081)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Batch sizes and pauses
    #[serde(default)]
    pub scenarios: ScenarioConfig,

    /// Which scenarios to run. Empty means all of them.
    #[serde(default)]
    pub selected: Vec<ScenarioKind>,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Per-scenario sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Requests in the rate-limit burst (default: 150)
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,

    /// Requests in the concurrent inbox burst (default: 50)
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Requests generated between the two health snapshots (default: 100)
    #[serde(default = "default_health_load_requests")]
    pub health_load_requests: usize,

    /// Pause before the second health snapshot in milliseconds (default: 1000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Colorize console output (default: true)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Emit logs as JSON lines (default: false)
    #[serde(default)]
    pub log_json: bool,

    /// Write a JSON run report to this path
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}

/// The scenarios the suite knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Snapshot health, generate load, snapshot again
    HealthMonitoring,
    /// Varied inbox posts, measures throughput
    ConcurrentInbox,
    /// Inbox burst expected to trip the rate limiter
    RateLimit,
    /// Sends to unreachable servers to fill the retry queue
    RetryQueue,
}

impl ScenarioKind {
    /// Execution order. Health and throughput run before the rate limiter
    /// is saturated by the burst probe.
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::HealthMonitoring,
        ScenarioKind::ConcurrentInbox,
        ScenarioKind::RateLimit,
        ScenarioKind::RetryQueue,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::HealthMonitoring => "Health Monitoring Test",
            Self::ConcurrentInbox => "Concurrent Inbox Test",
            Self::RateLimit => "Rate Limiting Load Test",
            Self::RetryQueue => "Retry Queue Simulation",
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HealthMonitoring => write!(f, "health-monitoring"),
            Self::ConcurrentInbox => write!(f, "concurrent-inbox"),
            Self::RateLimit => write!(f, "rate-limit"),
            Self::RetryQueue => write!(f, "retry-queue"),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_rate_limit_requests() -> usize {
    150
}

fn default_concurrent_requests() -> usize {
    50
}

fn default_health_load_requests() -> usize {
    100
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            scenarios: ScenarioConfig::default(),
            selected: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: default_rate_limit_requests(),
            concurrent_requests: default_concurrent_requests(),
            health_load_requests: default_health_load_requests(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: default_true(),
            log_json: false,
            report_json: None,
        }
    }
}

impl Config {
    /// Get the per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Scenarios to run, in execution order.
    pub fn scenario_plan(&self) -> Vec<ScenarioKind> {
        ScenarioKind::ALL
            .into_iter()
            .filter(|kind| self.selected.is_empty() || self.selected.contains(kind))
            .collect()
    }
}

impl ScenarioConfig {
    /// Get the settle pause duration
    pub fn settle_duration(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
