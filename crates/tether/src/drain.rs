// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replays outbox messages over a confirmed relay link.
//!
//! Delivery is at least once: a message leaves the outbox once its frame is
//! handed to an open socket. Frames the socket never wrote go back to the
//! relay client's in-memory queue and are flushed on reconnect, or returned
//! to the outbox by [`requeue_unsent`]. Receivers deduplicate by `id`.
//!
//! ```json
//! {"type": "queued_message", "id": "msg_...", "containerId": "hub",
//!  "content": "...", "imageUrl": "https://...", "ts": 1700000000000}
//! ```

use serde_json::{json, Value};
use tether_core::{now_millis, ConnectionState, NewMessage, QueuedMessage};
use tether_outbox::{Outbox, SyncUpdate};
use tether_relay::{Delivery, RelayClient};
use tracing::{debug, info, warn};

pub const QUEUED_MESSAGE_TYPE: &str = "queued_message";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub remaining: usize,
}

pub fn queued_message_frame(message: &QueuedMessage) -> Value {
    let mut frame = json!({
        "type": QUEUED_MESSAGE_TYPE,
        "id": message.id,
        "containerId": message.container_id,
        "content": message.content,
        "ts": message.timestamp,
    });
    if let Some(url) = &message.image_url {
        frame["imageUrl"] = json!(url);
    }
    frame
}

/// Send every pending message while the link stays confirmed.
pub async fn drain_outbox(client: &RelayClient, outbox: &Outbox) -> DrainReport {
    if client.state() != ConnectionState::Connected {
        debug!(state = %client.state(), "relay not connected, drain skipped");
        return DrainReport {
            sent: 0,
            remaining: outbox.pending_count().await,
        };
    }

    let started = now_millis();
    let mut sent = 0;
    for message in outbox.list_pending().await {
        if client.state() != ConnectionState::Connected {
            break;
        }
        match client.send(queued_message_frame(&message)) {
            Delivery::Transmitted => {
                outbox.remove(&message.id).await;
                sent += 1;
            }
            Delivery::Queued => {
                warn!(id = %message.id, "relay link dropped during drain");
                break;
            }
        }
    }

    let remaining = outbox.pending_count().await;
    outbox
        .update_sync_metadata(SyncUpdate {
            last_sync_attempt: Some(started),
            pending_count: Some(remaining as u64),
            last_successful_sync: (remaining == 0).then(now_millis),
        })
        .await;
    if sent > 0 || remaining > 0 {
        info!(sent, remaining, "outbox drained");
    }
    DrainReport { sent, remaining }
}

/// Put `queued_message` frames returned by `RelayClient::disconnect` back
/// into the outbox. Other frames are dropped. Returns how many were queued.
pub async fn requeue_unsent(outbox: &Outbox, frames: Vec<Value>) -> usize {
    let mut requeued = 0;
    for frame in frames {
        if frame.get("type").and_then(Value::as_str) != Some(QUEUED_MESSAGE_TYPE) {
            continue;
        }
        let (Some(container_id), Some(content)) = (
            frame.get("containerId").and_then(Value::as_str),
            frame.get("content").and_then(Value::as_str),
        ) else {
            warn!("dropping malformed queued_message frame");
            continue;
        };
        let message = NewMessage {
            container_id: container_id.to_string(),
            content: content.to_string(),
            image_url: frame
                .get("imageUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        match outbox.enqueue(message).await {
            Ok(_) => requeued += 1,
            Err(e) => warn!(error = %e, "cannot return unsent message to the outbox"),
        }
    }
    requeued
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tether_config::RelayConfig;
    use tether_core::{NewMessage, PersistentQueue};
    use tether_outbox::{FallbackQueue, KvQueue};
    use tether_relay::ChannelHandler;
    use tether_storage::MemoryKvStore;
    use tether_test_utils::{queued, MockRelay};

    use super::*;

    fn memory_outbox() -> Outbox {
        let fallback: Arc<dyn PersistentQueue> = Arc::new(KvQueue::new(MemoryKvStore::new()));
        Outbox::new(FallbackQueue::new(None, fallback), None, Outbox::DEFAULT_CAPACITY)
    }

    #[test]
    fn frame_shape() {
        let mut message = queued("msg_1", "hub", 42);
        assert_eq!(
            queued_message_frame(&message),
            json!({
                "type": "queued_message",
                "id": "msg_1",
                "containerId": "hub",
                "content": "message msg_1",
                "ts": 42,
            })
        );

        message.image_url = Some("https://cdn.example/a.png".into());
        assert_eq!(
            queued_message_frame(&message)["imageUrl"],
            "https://cdn.example/a.png"
        );
    }

    #[tokio::test]
    async fn disconnected_link_leaves_outbox_alone() {
        let outbox = memory_outbox();
        outbox.enqueue(NewMessage::text("hub", "later")).await.unwrap();
        let client = RelayClient::new(RelayConfig::default());

        let report = drain_outbox(&client, &outbox).await;
        assert_eq!(report, DrainReport { sent: 0, remaining: 1 });
        assert_eq!(client.pending_frames(), 0);
        assert_eq!(outbox.sync_metadata().await, None);
    }

    #[tokio::test]
    async fn confirmed_link_sends_everything_in_order() {
        let relay = MockRelay::start_confirming().await;
        let outbox = memory_outbox();
        let first = outbox.enqueue(NewMessage::text("hub", "one")).await.unwrap();
        let second = outbox.enqueue(NewMessage::text("zelda", "two")).await.unwrap();

        let client = RelayClient::new(RelayConfig {
            url: relay.url().to_string(),
            ..RelayConfig::default()
        });
        let (handler, _events) = ChannelHandler::new();
        client.connect("123456", handler).unwrap();
        client
            .await_confirmation(Duration::from_secs(5))
            .await
            .unwrap();

        let report = drain_outbox(&client, &outbox).await;
        assert_eq!(report, DrainReport { sent: 2, remaining: 0 });
        assert!(outbox.list_pending().await.is_empty());

        let wait = Duration::from_secs(5);
        assert_eq!(relay.next_non_ping(wait).await.unwrap()["type"], "connection_request");
        let a = relay.next_non_ping(wait).await.unwrap();
        let b = relay.next_non_ping(wait).await.unwrap();
        assert_eq!((a["id"].as_str(), b["id"].as_str()), (Some(first.as_str()), Some(second.as_str())));
        assert_eq!(a["type"], "queued_message");

        let meta = outbox.sync_metadata().await.unwrap();
        assert_eq!(meta.pending_count, 0);
        assert!(meta.last_successful_sync >= meta.last_sync_attempt);
        client.disconnect();
    }

    #[tokio::test]
    async fn unsent_frames_return_to_the_outbox() {
        let outbox = memory_outbox();
        let mut with_image = queued("msg_a", "hub", 1);
        with_image.image_url = Some("https://cdn.example/a.png".into());
        let frames = vec![
            queued_message_frame(&with_image),
            json!({"type": "chat", "text": "not a queued message"}),
            queued_message_frame(&queued("msg_b", "zelda", 2)),
        ];

        assert_eq!(requeue_unsent(&outbox, frames).await, 2);
        let pending = outbox.list_pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].content, "message msg_a");
        assert_eq!(pending[0].image_url.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(pending[1].container_id, "zelda");
    }
}
