// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay wire frames.
//!
//! Client -> relay (JSON text frames):
//! ```json
//! {"type": "connection_request", "code": "123456", "ts": 1700000000000}
//! {"type": "ping", "ts": 1700000000000}
//! ```
//!
//! Relay -> client frames that confirm a partner is attached (any of):
//! ```json
//! {"type": "partner_connected"}
//! {"type": "connection_alive"}
//! {"type": "connected"}
//! {"status": "connected"}
//! ```

use serde::Serialize;
use serde_json::Value;

/// Frames the link manager emits on its own behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// First frame on every newly opened socket.
    ConnectionRequest { code: String, ts: i64 },
    /// Keep-alive. No pong is expected.
    Ping { ts: i64 },
}

impl ControlFrame {
    pub fn to_text(&self) -> String {
        // Serializing a plain enum of strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `type` values that confirm the partner is reachable.
pub const CONFIRMATION_TYPES: &[&str] = &["partner_connected", "connection_alive", "connected"];

/// Whether an inbound frame confirms the pairing.
pub fn is_confirmation(frame: &Value) -> bool {
    let by_type = frame
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| CONFIRMATION_TYPES.contains(&t));
    let by_status = frame.get("status").and_then(Value::as_str) == Some("connected");
    by_type || by_status
}

/// Whether a frame is the request every socket sends first.
pub fn is_connection_request(frame: &Value) -> bool {
    frame.get("type").and_then(Value::as_str) == Some("connection_request")
}
