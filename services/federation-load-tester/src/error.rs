// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the federation load tester.
//!
//! Per-request failures never show up here: they are captured as
//! [`RequestOutcome`](crate::executor::RequestOutcome) data with status 0.
//! Only conditions that stop the whole run are errors.

use thiserror::Error;

/// Run-level error types
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Federation server at {url} is not reachable: {reason}")]
    SutUnreachable { url: String, reason: String },

    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Run interrupted by user")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LoadTestError>;
