// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Federation Load Tester
//!
//! A concurrent load-testing harness for the federation service. It treats
//! the server as an opaque HTTP endpoint and measures how it behaves under
//! bursts of traffic:
//!
//! - Rate limiting of the inbox (expects 429 under a 150 request burst)
//! - Inbox throughput with varied concurrent posts
//! - Acceptance of activities bound for unreachable servers (retry queue)
//! - Health counters before and after a burst
//!
//! Every request yields exactly one outcome. Transport failures are data
//! (status 0), never errors; only an unreachable server aborts a run.

pub mod activities;
pub mod batch;
pub mod config;
pub mod error;
pub mod executor;
pub mod health;
pub mod metrics;
pub mod report;
pub mod scenarios;
pub mod suite;
pub mod transport;

pub use batch::{BatchResult, BatchRunner, Shutdown};
pub use config::{Config, ScenarioKind};
pub use error::{LoadTestError, Result};
pub use executor::{RequestExecutor, RequestOutcome, TRANSPORT_FAILURE};
pub use health::{HealthDelta, HealthSnapshot};
pub use metrics::{AggregateStats, LatencyLedger};
pub use suite::{ScenarioSuite, SuiteReport};
pub use transport::{HttpTransport, Method, RequestSpec, Transport, TransportError, TransportResponse};
