// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callbacks the relay client invokes as the link changes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_core::ConnectionError;
use tokio::sync::mpsc;

/// How a socket ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    /// A closing handshake completed. Only closes requested through
    /// `disconnect()` suppress the reconnect.
    pub was_clean: bool,
    /// Delay before the scheduled reconnect, if one was scheduled.
    pub reconnect_in: Option<Duration>,
}

impl CloseInfo {
    /// Close code used for intentional local disconnects.
    pub const NORMAL: u16 = 1000;
    /// Close code reported when the peer sent an empty close frame.
    pub const NO_STATUS: u16 = 1005;

    pub(crate) fn user_disconnected() -> Self {
        Self {
            code: Self::NORMAL,
            reason: "User disconnected".to_string(),
            was_clean: true,
            reconnect_in: None,
        }
    }

    pub(crate) fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
            reconnect_in: None,
        }
    }

    pub(crate) fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: tether_core::ABNORMAL_CLOSE_CODE,
            reason: reason.into(),
            was_clean: false,
            reconnect_in: None,
        }
    }
}

/// Receiver of link events.
///
/// Callbacks run on the client's socket task and must not block. After
/// `disconnect()` returns, the session's handler receives nothing further.
pub trait RelayHandler: Send + Sync + 'static {
    /// A socket opened and the connection request went out.
    fn on_open(&self) {}

    /// A text frame that parsed as JSON, confirmation frames included.
    fn on_message(&self, frame: Value);

    /// Failures: invalid codes, unreachable relay, abnormal closes.
    fn on_error(&self, _error: &ConnectionError) {}

    fn on_close(&self, _close: &CloseInfo) {}
}

/// A link event, as delivered by [`ChannelHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Open,
    Message(Value),
    Error(ConnectionError),
    Close(CloseInfo),
}

/// Forwards every callback into an unbounded channel so async code can
/// `recv().await` link events.
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<RelayEvent>,
}

impl ChannelHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl RelayHandler for ChannelHandler {
    fn on_open(&self) {
        let _ = self.tx.send(RelayEvent::Open);
    }

    fn on_message(&self, frame: Value) {
        let _ = self.tx.send(RelayEvent::Message(frame));
    }

    fn on_error(&self, error: &ConnectionError) {
        let _ = self.tx.send(RelayEvent::Error(error.clone()));
    }

    fn on_close(&self, close: &CloseInfo) {
        let _ = self.tx.send(RelayEvent::Close(close.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn channel_handler_forwards_in_order() {
        let (handler, mut rx) = ChannelHandler::new();
        handler.on_open();
        handler.on_message(json!({"type": "connected"}));
        handler.on_close(&CloseInfo::user_disconnected());

        assert_eq!(rx.recv().await, Some(RelayEvent::Open));
        assert_eq!(
            rx.recv().await,
            Some(RelayEvent::Message(json!({"type": "connected"})))
        );
        match rx.recv().await {
            Some(RelayEvent::Close(close)) => {
                assert!(close.was_clean);
                assert_eq!(close.code, CloseInfo::NORMAL);
            }
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (handler, rx) = ChannelHandler::new();
        drop(rx);
        handler.on_message(json!({}));
    }
}
