// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP transport to the federation server.
//!
//! [`Transport`] is the seam between the harness and the network. The
//! production implementation is [`HttpTransport`] on top of a pooled
//! `reqwest::Client`; tests plug in scripted transports.

use crate::error::{LoadTestError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// HTTP methods the harness issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One request to send, relative to the server base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Path on the federation server, e.g. `/federation/inbox`
    pub endpoint: String,
    pub method: Method,
    /// JSON body for POST requests
    pub payload: Option<Value>,
}

impl RequestSpec {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::Get,
            payload: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, payload: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::Post,
            payload: Some(payload),
        }
    }
}

/// A response that made it back over the wire, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Failures that happen before an HTTP status is available.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection refused or host unreachable: {0}")]
    Connect(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_timeout() {
            Self::Request(format!("timeout: {err}"))
        } else if err.is_body() || err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Sends a single request and reports what came back.
///
/// Implementations must not retry; retries are the server's business.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &RequestSpec) -> std::result::Result<TransportResponse, TransportError>;

    /// Human-readable target, used in log lines and reports.
    fn target(&self) -> String;
}

/// Slack added to the client timeout so the executor's own timeout always
/// fires first and reports [`TransportError::Timeout`].
pub const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Transport backed by a shared `reqwest::Client` connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    client_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for `base_url`. Only http and https are accepted.
    ///
    /// `timeout` is the per-request limit enforced by the executor; the
    /// client only keeps a backstop slightly above it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| LoadTestError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LoadTestError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        if parsed.host_str().is_none() {
            return Err(LoadTestError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let client_timeout = timeout + CLIENT_TIMEOUT_GRACE;
        let client = reqwest::Client::builder().timeout(client_timeout).build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            client_timeout,
        })
    }

    /// Backstop timeout configured on the underlying client.
    pub fn client_timeout(&self) -> Duration {
        self.client_timeout
    }

    /// Absolute URL for an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestSpec) -> std::result::Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.endpoint);

        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => match &request.payload {
                Some(payload) => self.client.post(&url).json(payload),
                None => self.client.post(&url),
            },
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(method = %request.method, %url, status, "response received");

        Ok(TransportResponse { status, body })
    }

    fn target(&self) -> String {
        self.base_url.clone()
    }
}
