// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scenario suite orchestration.
//!
//! The suite starts with a liveness check against the health endpoint and
//! refuses to run anything if it fails. It then runs the selected
//! scenarios in order, stops early on interrupt, and closes with a
//! summary over every request issued.

use crate::batch::{BatchRunner, Shutdown};
use crate::config::{Config, ScenarioKind};
use crate::error::{LoadTestError, Result};
use crate::executor::RequestExecutor;
use crate::health::{health_request, HEALTH_ENDPOINT};
use crate::metrics::{LatencyLedger, LedgerSummary};
use crate::report;
use crate::scenarios::{ScenarioReport, ScenarioRunner};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything a completed (or interrupted) run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioReport>,
    /// Latency over every request of the run, `None` if nothing completed
    pub summary: Option<LedgerSummary>,
    pub interrupted: bool,
}

impl SuiteReport {
    pub fn scenario(&self, kind: ScenarioKind) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|report| report.kind() == kind)
    }

    pub fn warnings(&self) -> Vec<(ScenarioKind, String)> {
        self.scenarios
            .iter()
            .flat_map(|report| {
                let kind = report.kind();
                report.warnings().into_iter().map(move |w| (kind, w))
            })
            .collect()
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Renders the closing summary section.
impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.summary {
            Some(summary) => {
                writeln!(f, "  Total requests: {}", summary.count)?;
                writeln!(f, "  Avg response time: {}", report::millis(summary.latency.avg))?;
                writeln!(f, "  Min response time: {}", report::millis(summary.latency.min))?;
                writeln!(f, "  Max response time: {}", report::millis(summary.latency.max))?;
            }
            None => writeln!(f, "  No requests completed")?,
        }

        let warnings = self.warnings();
        if !warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", report::heading("Warnings:"))?;
            for (kind, warning) in warnings {
                writeln!(f, "  {}", report::warning(&format!("{kind}: {warning}")))?;
            }
        }

        writeln!(f)?;
        if self.interrupted {
            writeln!(f, "{}", report::warning("Tests interrupted by user"))
        } else {
            writeln!(f, "{}", report::ok("All load tests completed"))
        }
    }
}

/// Runs the configured scenarios against one federation server.
pub struct ScenarioSuite<T> {
    runner: BatchRunner<T>,
    config: Config,
    ledger: LatencyLedger,
}

impl<T: Transport> ScenarioSuite<T> {
    pub fn new(transport: Arc<T>, config: Config, shutdown: Shutdown) -> Self {
        let executor = RequestExecutor::new(transport, config.request_timeout());
        Self {
            runner: BatchRunner::new(executor, shutdown),
            config,
            ledger: LatencyLedger::new(),
        }
    }

    fn target(&self) -> String {
        self.runner.executor().transport().target()
    }

    /// Fails with [`LoadTestError::SutUnreachable`] unless health answers 200,
    /// or with [`LoadTestError::Interrupted`] if shutdown fires first.
    pub async fn check_liveness(&self) -> Result<()> {
        let shutdown = self.runner.shutdown();
        let request = health_request();
        let outcome = tokio::select! {
            biased;
            _ = shutdown.triggered() => return Err(LoadTestError::Interrupted),
            outcome = self.runner.executor().execute(&request) => outcome,
        };

        match outcome.status_code {
            200 => Ok(()),
            0 => Err(LoadTestError::SutUnreachable {
                url: self.target(),
                reason: outcome.body,
            }),
            status => Err(LoadTestError::SutUnreachable {
                url: self.target(),
                reason: format!("{HEALTH_ENDPOINT} returned status {status}"),
            }),
        }
    }

    /// Run the whole suite, rendering progress to `out`.
    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<SuiteReport> {
        writeln!(out)?;
        writeln!(out, "{}", report::banner("Federation Load Testing Suite"))?;
        writeln!(out)?;

        match self.check_liveness().await {
            Ok(()) => writeln!(out, "{}", report::ok("Federation server is running"))?,
            Err(LoadTestError::Interrupted) => {
                warn!("Interrupted during liveness check, no scenario will run");
            }
            Err(err) => {
                error!(error = %err, "Liveness check failed, no scenario will run");
                writeln!(out, "{}", report::failure("Federation server is not responding"))?;
                writeln!(out, "  Error: {err}")?;
                return Err(err);
            }
        }

        self.ledger = LatencyLedger::new();
        let started_at = Utc::now();
        let shutdown = self.runner.shutdown().clone();
        let mut scenarios = Vec::new();

        for kind in self.config.scenario_plan() {
            if shutdown.is_triggered() {
                break;
            }

            info!(scenario = %kind, "Starting scenario");
            writeln!(out)?;
            writeln!(out, "{}", report::banner(kind.title()))?;
            writeln!(out)?;

            let scenario = ScenarioRunner::new(&self.runner, &self.config.scenarios, &mut self.ledger)
                .run(kind)
                .await;
            write!(out, "{scenario}")?;
            scenarios.push(scenario);
        }

        let interrupted = shutdown.is_triggered();
        if interrupted {
            warn!(completed = scenarios.len(), "Suite interrupted");
        }

        let suite_report = SuiteReport {
            target: self.target(),
            started_at,
            scenarios,
            summary: self.ledger.summary(),
            interrupted,
        };

        writeln!(out)?;
        writeln!(out, "{}", report::banner("Test Summary"))?;
        writeln!(out)?;
        write!(out, "{suite_report}")?;
        out.flush()?;

        info!(
            requests = self.ledger.len(),
            interrupted,
            "Suite finished"
        );
        Ok(suite_report)
    }
}
