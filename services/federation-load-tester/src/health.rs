// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Health snapshots of the federation server and their deltas.
//!
//! Snapshots are best-effort telemetry. Any field the server leaves out
//! reads as zero (or empty for `status`); a body that is not JSON at all
//! yields an all-default snapshot. A snapshot that could not be fetched
//! makes the delta [`HealthDelta::Unavailable`] instead of a zero delta.

use crate::executor::RequestOutcome;
use crate::transport::RequestSpec;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Health endpoint of the federation server.
pub const HEALTH_ENDPOINT: &str = "/federation/health";

pub fn health_request() -> RequestSpec {
    RequestSpec::get(HEALTH_ENDPOINT)
}

/// Point-in-time view of the server's health counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub total_messages: i64,
    pub average_latency_ms: f64,
    pub successful_deliveries: i64,
    pub failed_deliveries: i64,
    pub pending_retries: i64,
    pub rate_limit_violations: i64,
    pub uptime_seconds: i64,
}

/// Why a snapshot could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthUnavailable {
    #[error("health request failed: {0}")]
    Transport(String),

    #[error("health endpoint returned status {0}")]
    Status(u16),

    #[error("interrupted before the health request completed")]
    Interrupted,
}

impl HealthSnapshot {
    /// Read a snapshot from a decoded health body.
    pub fn from_value(value: &Value) -> Self {
        Self {
            status: value
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            total_messages: int_field(value, "total_messages"),
            average_latency_ms: value
                .get("average_latency_ms")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            successful_deliveries: int_field(value, "successful_deliveries"),
            failed_deliveries: int_field(value, "failed_deliveries"),
            pending_retries: int_field(value, "pending_retries"),
            rate_limit_violations: int_field(value, "rate_limit_violations"),
            uptime_seconds: int_field(value, "uptime_seconds"),
        }
    }

    /// Parse a raw health body, falling back to defaults on bad JSON.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                warn!(error = %err, "Malformed health response, using defaults");
                Self::default()
            }
        }
    }

    /// Interpret the outcome of a health request.
    pub fn from_outcome(outcome: &RequestOutcome) -> Result<Self, HealthUnavailable> {
        match outcome.status_code {
            0 => Err(HealthUnavailable::Transport(outcome.body.clone())),
            200 => Ok(Self::parse(&outcome.body)),
            status => Err(HealthUnavailable::Status(status)),
        }
    }
}

fn int_field(value: &Value, key: &str) -> i64 {
    match value.get(key) {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        None => 0,
    }
}

/// Change between a snapshot taken before a burst and one taken after.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HealthDelta {
    Available {
        message_delta: i64,
        latest_status: String,
        latest_latency_ms: f64,
        failed_delivery_delta: i64,
        pending_retry_delta: i64,
        rate_limit_violation_delta: i64,
    },
    Unavailable {
        reason: String,
    },
}

impl HealthDelta {
    /// Counter deltas between two snapshots. Counters come from the server,
    /// so a difference outside `i64` makes the delta unavailable.
    pub fn between(before: &HealthSnapshot, after: &HealthSnapshot) -> Self {
        let deltas = (
            after.total_messages.checked_sub(before.total_messages),
            after.failed_deliveries.checked_sub(before.failed_deliveries),
            after.pending_retries.checked_sub(before.pending_retries),
            after.rate_limit_violations.checked_sub(before.rate_limit_violations),
        );

        match deltas {
            (
                Some(message_delta),
                Some(failed_delivery_delta),
                Some(pending_retry_delta),
                Some(rate_limit_violation_delta),
            ) => Self::Available {
                message_delta,
                latest_status: after.status.clone(),
                latest_latency_ms: after.average_latency_ms,
                failed_delivery_delta,
                pending_retry_delta,
                rate_limit_violation_delta,
            },
            _ => {
                warn!(?before, ?after, "Health counter delta overflows");
                Self::Unavailable {
                    reason: "counter overflow".to_string(),
                }
            }
        }
    }

    /// Delta from two fetch results; either failure makes it unavailable.
    pub fn diff(
        before: &Result<HealthSnapshot, HealthUnavailable>,
        after: &Result<HealthSnapshot, HealthUnavailable>,
    ) -> Self {
        match (before, after) {
            (Ok(before), Ok(after)) => Self::between(before, after),
            (Err(err), _) => Self::Unavailable {
                reason: format!("initial snapshot: {err}"),
            },
            (_, Err(err)) => Self::Unavailable {
                reason: format!("final snapshot: {err}"),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn message_delta(&self) -> Option<i64> {
        match self {
            Self::Available { message_delta, .. } => Some(*message_delta),
            Self::Unavailable { .. } => None,
        }
    }
}
