// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Federation Load Tester
//!
//! Runs the load scenarios against a federation server and prints a
//! report per scenario plus a closing summary.
//!
//! ## Configuration
//!
//! - `--base-url` / `FEDERATION_URL`: server base URL (default: http://localhost:8081)
//! - `--scenario`: restrict the run, repeatable (default: all four)
//! - `--rate-limit-requests`, `--concurrent-requests`, `--health-load-requests`:
//!   batch sizes (defaults: 150, 50, 100)
//! - `--timeout-ms`: per-request timeout (default: 10000)
//! - `--settle-ms`: pause before the second health snapshot (default: 1000)
//! - `--report-json`: also write the run report as JSON
//!
//! Log verbosity follows `RUST_LOG` (default: info). Logs go to stderr.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use federation_load_tester::{
    batch::Shutdown,
    config::{Config, OutputConfig, ScenarioConfig, ScenarioKind},
    error::LoadTestError,
    report,
    suite::ScenarioSuite,
    transport::HttpTransport,
};

#[derive(Parser)]
#[command(
    name = "federation-load-tester",
    about = "Load test a federation server: rate limiting, inbox throughput, retry queue, health"
)]
struct Args {
    /// Base URL of the federation server
    #[arg(long, env = "FEDERATION_URL")]
    base_url: Option<String>,

    /// Scenario to run (repeatable); runs all when omitted
    #[arg(long = "scenario", value_enum)]
    scenarios: Vec<ScenarioKind>,

    /// Requests in the rate-limit burst
    #[arg(long)]
    rate_limit_requests: Option<usize>,

    /// Requests in the concurrent inbox burst
    #[arg(long)]
    concurrent_requests: Option<usize>,

    /// Requests generated between the two health snapshots
    #[arg(long)]
    health_load_requests: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause before the second health snapshot in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            scenarios: ScenarioConfig {
                rate_limit_requests: self
                    .rate_limit_requests
                    .unwrap_or(defaults.scenarios.rate_limit_requests),
                concurrent_requests: self
                    .concurrent_requests
                    .unwrap_or(defaults.scenarios.concurrent_requests),
                health_load_requests: self
                    .health_load_requests
                    .unwrap_or(defaults.scenarios.health_load_requests),
                settle_ms: self.settle_ms.unwrap_or(defaults.scenarios.settle_ms),
            },
            selected: self.scenarios,
            output: OutputConfig {
                color: !self.no_color,
                log_json: self.log_json,
                report_json: self.report_json,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config();

    // Initialize tracing
    let log_json = config.output.log_json;
    tracing_subscriber::registry()
        .with(log_json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if !config.output.color {
        report::set_color(false);
    }

    info!(
        base_url = %config.base_url,
        scenarios = ?config.scenario_plan(),
        timeout_ms = config.timeout_ms,
        "Starting federation load test"
    );

    // First Ctrl-C stops the suite after rendering what completed; a second one exits at once
    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, abandoning in-flight requests");
        signal.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Second interrupt received, exiting");
            std::process::exit(1);
        }
    });

    let transport = Arc::new(HttpTransport::new(&config.base_url, config.request_timeout())?);
    let report_path = config.output.report_json.clone();
    let mut suite = ScenarioSuite::new(transport, config, shutdown);

    let mut stdout = std::io::stdout();
    let suite_report = suite.run(&mut stdout).await?;

    if let Some(path) = report_path {
        suite_report.write_json(&path)?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    if suite_report.interrupted {
        return Err(LoadTestError::Interrupted.into());
    }

    Ok(())
}
