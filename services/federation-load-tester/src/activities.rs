// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Activity generators for the load scenarios.
//!
//! Each generator returns the full batch of requests for one scenario.
//! Request `i` is deterministic apart from the post timestamp.

use crate::transport::RequestSpec;
use chrono::Utc;
use serde_json::json;

/// Inbound activity endpoint. Answers 200 on success, 429 when throttled.
pub const INBOX_ENDPOINT: &str = "/federation/inbox";

/// Outbound activity endpoint. Answers 200 or 201 once queued.
pub const SEND_ENDPOINT: &str = "/federation/send";

/// Identical test activities from one remote server, for tripping the limiter.
pub fn rate_limit_burst(count: usize) -> Vec<RequestSpec> {
    (0..count)
        .map(|i| {
            RequestSpec::post(
                INBOX_ENDPOINT,
                json!({
                    "activity_type": "Test",
                    "actor": format!("loadtest_{i}"),
                    "actor_server": "https://loadtest.com",
                    "payload": { "test": true }
                }),
            )
        })
        .collect()
}

/// Posts spread over ten remote servers.
pub fn varied_posts(count: usize) -> Vec<RequestSpec> {
    (0..count)
        .map(|i| {
            RequestSpec::post(
                INBOX_ENDPOINT,
                json!({
                    "activity_type": "Post",
                    "actor": format!("user_{i}"),
                    "actor_server": format!("https://server{}.com", i % 10),
                    "payload": {
                        "content": format!("Test post {i}"),
                        "timestamp": Utc::now().to_rfc3339()
                    }
                }),
            )
        })
        .collect()
}

/// Likes with an empty payload, used as background load.
pub fn likes(count: usize) -> Vec<RequestSpec> {
    (0..count)
        .map(|i| {
            RequestSpec::post(
                INBOX_ENDPOINT,
                json!({
                    "activity_type": "Like",
                    "actor": format!("loadtest_{i}"),
                    "actor_server": "https://loadtest.com",
                    "payload": {}
                }),
            )
        })
        .collect()
}

/// Follows addressed to `.invalid` hosts, which can never be delivered.
pub fn unreachable_follows(count: usize) -> Vec<RequestSpec> {
    (0..count)
        .map(|i| {
            RequestSpec::post(
                SEND_ENDPOINT,
                json!({
                    "activity_type": "Follow",
                    "actor_id": format!("user{i}@localhost"),
                    "target_server": format!("https://fake-server-{i}.invalid"),
                    "payload": { "test": true }
                }),
            )
        })
        .collect()
}
