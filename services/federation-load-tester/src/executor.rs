// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Single-request execution with latency measurement.
//!
//! Every call yields exactly one [`RequestOutcome`]. Transport faults and
//! timeouts become outcomes with status 0 and the failure text as body.

use crate::transport::{RequestSpec, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Status code reserved for requests that never got an HTTP response.
pub const TRANSPORT_FAILURE: u16 = 0;

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    /// HTTP status, or [`TRANSPORT_FAILURE`]
    pub status_code: u16,
    /// Response text, or the failure description for status 0
    pub body: String,
    /// Time from just before the call until the outcome was known
    pub latency: Duration,
}

impl RequestOutcome {
    pub fn transport_failure(reason: impl Into<String>, latency: Duration) -> Self {
        Self {
            status_code: TRANSPORT_FAILURE,
            body: reason.into(),
            latency,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE
    }
}

/// Issues requests through a [`Transport`] with a bounded timeout.
pub struct RequestExecutor<T> {
    transport: Arc<T>,
    timeout: Duration,
}

impl<T> Clone for RequestExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` and normalize whatever happens into an outcome.
    pub async fn execute(&self, request: &RequestSpec) -> RequestOutcome {
        let start = Instant::now();
        let result = timeout(self.timeout, self.transport.send(request)).await;
        let latency = start.elapsed();

        match result {
            Ok(Ok(response)) => RequestOutcome {
                status_code: response.status,
                body: response.body,
                latency,
            },
            Ok(Err(err)) => {
                debug!(endpoint = %request.endpoint, error = %err, ?latency, "transport failure");
                RequestOutcome::transport_failure(err.to_string(), latency)
            }
            Err(_) => {
                let err = TransportError::Timeout(self.timeout);
                debug!(endpoint = %request.endpoint, ?latency, "request timed out");
                RequestOutcome::transport_failure(err.to_string(), latency)
            }
        }
    }
}
