// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay link tests against an in-process relay.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use tether_config::RelayConfig;
use tether_core::{ConnectionError, ConnectionState, TetherError, ABNORMAL_CLOSE_CODE};
use tether_relay::{ChannelHandler, Delivery, RelayClient, RelayEvent};
use tether_test_utils::MockRelay;

const WAIT: Duration = Duration::from_secs(5);

fn config(url: &str) -> RelayConfig {
    RelayConfig {
        url: url.to_string(),
        heartbeat_interval_ms: 30_000,
        backoff_base_ms: 20,
        backoff_max_ms: 100,
        jitter_ms: 0,
        confirm_timeout_ms: 1_000,
    }
}

async fn next_event(rx: &mut UnboundedReceiver<RelayEvent>) -> RelayEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a relay event")
        .expect("event channel closed")
}

/// Skip events until one matches.
async fn wait_for_event(
    rx: &mut UnboundedReceiver<RelayEvent>,
    mut matches: impl FnMut(&RelayEvent) -> bool,
) -> RelayEvent {
    loop {
        let event = next_event(rx).await;
        if matches(&event) {
            return event;
        }
    }
}

async fn wait_for_state(client: &RelayClient, target: ConnectionState) {
    let mut states = client.subscribe();
    tokio::time::timeout(WAIT, states.wait_for(|s| *s == target))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}

/// A local address nothing listens on.
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

#[tokio::test]
async fn connect_sends_connection_request_first() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);

    let frame = relay.next_non_ping(WAIT).await.unwrap();
    assert_eq!(frame["type"], "connection_request");
    assert_eq!(frame["code"], "123456");
    assert!(frame["ts"].as_i64().unwrap() > 0);
    assert_eq!(relay.paths(), vec!["/123456".to_string()]);
    assert_eq!(client.code().as_deref(), Some("123456"));
}

#[tokio::test]
async fn confirmation_frame_moves_to_connected() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    relay.next_non_ping(WAIT).await.unwrap();
    relay.send(json!({"type": "screenshot", "data": "..."}));
    relay.confirm();

    // Non-confirmation frames still reach the handler but do not confirm.
    let first = wait_for_event(&mut events, |e| matches!(e, RelayEvent::Message(_))).await;
    assert_eq!(first, RelayEvent::Message(json!({"type": "screenshot", "data": "..."})));
    let second = next_event(&mut events).await;
    assert_eq!(second, RelayEvent::Message(json!({"type": "partner_connected"})));

    wait_for_state(&client, ConnectionState::Connected).await;
}

#[tokio::test]
async fn await_confirmation_succeeds_with_confirming_relay() {
    let relay = MockRelay::start_confirming().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, _events) = ChannelHandler::new();

    client.connect("654321", handler).unwrap();
    client.await_confirmation(WAIT).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn invalid_code_opens_no_socket() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    let err = client.connect("12345", handler).unwrap_err();
    assert!(matches!(
        err,
        TetherError::Connection(ConnectionError::InvalidCode { .. })
    ));
    assert!(matches!(
        next_event(&mut events).await,
        RelayEvent::Error(ConnectionError::InvalidCode { .. })
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(relay.accept_count(), 0);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn frames_sent_offline_flush_in_order_after_connection_request() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, _events) = ChannelHandler::new();

    assert_eq!(client.send(json!({"n": 1})), Delivery::Queued);
    assert_eq!(client.send(json!({"n": 2})), Delivery::Queued);
    assert_eq!(client.pending_frames(), 2);

    client.connect("123456", handler).unwrap();
    let frames: Vec<Value> = vec![
        relay.next_non_ping(WAIT).await.unwrap(),
        relay.next_non_ping(WAIT).await.unwrap(),
        relay.next_non_ping(WAIT).await.unwrap(),
    ];
    assert_eq!(frames[0]["type"], "connection_request");
    assert_eq!(frames[1], json!({"n": 1}));
    assert_eq!(frames[2], json!({"n": 2}));
    assert_eq!(client.pending_frames(), 0);
}

#[tokio::test]
async fn send_on_open_socket_transmits() {
    let relay = MockRelay::start_confirming().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, _events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    client.await_confirmation(WAIT).await.unwrap();
    relay.next_non_ping(WAIT).await.unwrap();

    assert_eq!(client.send(json!({"type": "chat", "text": "hi"})), Delivery::Transmitted);
    assert_eq!(
        relay.next_non_ping(WAIT).await.unwrap(),
        json!({"type": "chat", "text": "hi"})
    );
}

#[tokio::test]
async fn connect_while_open_is_a_no_op() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler.clone()).unwrap();
    client.connect("123456", handler.clone()).unwrap();
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);
    client.connect("999999", handler).unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(relay.accept_count(), 1);
    assert_eq!(client.code().as_deref(), Some("123456"));
}

#[tokio::test]
async fn abnormal_close_reports_error_and_reconnects() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);
    relay.next_non_ping(WAIT).await.unwrap();

    relay.drop_connection();
    match wait_for_event(&mut events, |e| matches!(e, RelayEvent::Error(_))).await {
        RelayEvent::Error(ConnectionError::AbnormalClose { code, .. }) => {
            assert_eq!(code, ABNORMAL_CLOSE_CODE);
        }
        other => panic!("expected abnormal close, got {other:?}"),
    }
    match next_event(&mut events).await {
        RelayEvent::Close(close) => {
            assert!(!close.was_clean);
            assert!(close.reconnect_in.is_some());
        }
        other => panic!("expected close, got {other:?}"),
    }

    // The reconnect opens a fresh socket and announces itself again.
    assert!(relay.wait_for_connections(2, WAIT).await);
    assert_eq!(
        wait_for_event(&mut events, |e| *e == RelayEvent::Open).await,
        RelayEvent::Open
    );
    let again = relay.next_non_ping(WAIT).await.unwrap();
    assert_eq!(again["type"], "connection_request");
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test]
async fn clean_remote_close_reconnects_without_error() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);
    relay.next_non_ping(WAIT).await.unwrap();
    relay.close(1001, "relay restarting");

    // No error precedes the close.
    match next_event(&mut events).await {
        RelayEvent::Close(close) => {
            assert!(close.was_clean);
            assert_eq!(close.code, 1001);
            assert_eq!(close.reason, "relay restarting");
            assert!(close.reconnect_in.is_some());
        }
        other => panic!("expected close, got {other:?}"),
    }

    assert!(relay.wait_for_connections(2, WAIT).await);
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);
    assert_eq!(
        relay.next_non_ping(WAIT).await.unwrap()["type"],
        "connection_request"
    );
    assert_eq!(relay.paths(), vec!["/123456".to_string(), "/123456".to_string()]);
    client.disconnect();
}

#[tokio::test]
async fn disconnect_closes_cleanly_and_never_reconnects() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);

    client.disconnect();
    assert!(!client.state().is_active());
    match next_event(&mut events).await {
        RelayEvent::Close(close) => {
            assert!(close.was_clean);
            assert_eq!(close.code, 1000);
            assert_eq!(close.reason, "User disconnected");
        }
        other => panic!("expected close, got {other:?}"),
    }

    wait_for_state(&client, ConnectionState::Disconnected).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(relay.accept_count(), 1);
    assert_eq!(relay.closes_received(), 1);
    assert_eq!(client.code(), None);

    // Idempotent: no second close, no events.
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn disconnect_during_backoff_cancels_reconnect() {
    let relay = MockRelay::start().await;
    let mut slow = config(relay.url());
    slow.backoff_base_ms = 300;
    let client = RelayClient::new(slow);
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert_eq!(next_event(&mut events).await, RelayEvent::Open);
    relay.drop_connection();
    wait_for_event(&mut events, |e| matches!(e, RelayEvent::Close(_))).await;
    assert_eq!(client.state(), ConnectionState::Error);

    client.disconnect();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(relay.accept_count(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_returns_unsent_frames() {
    let client = RelayClient::new(config(&closed_port_url().await));
    client.send(json!({"n": 1}));
    client.send(json!({"n": 2}));

    let unsent = client.disconnect();
    assert_eq!(unsent, vec![json!({"n": 1}), json!({"n": 2})]);
    assert_eq!(client.pending_frames(), 0);
}

#[tokio::test]
async fn unreachable_relay_reports_and_keeps_retrying() {
    let client = RelayClient::new(config(&closed_port_url().await));
    let (handler, mut events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        RelayEvent::Error(ConnectionError::Unreachable { .. })
    ));
    // Second failure proves a reconnect happened.
    wait_for_event(&mut events, |e| matches!(e, RelayEvent::Close(_))).await;
    wait_for_event(&mut events, |e| matches!(e, RelayEvent::Error(_))).await;
    assert!(client.reconnect_attempts() >= 2);

    client.disconnect();
}

#[tokio::test]
async fn confirmation_timeout_distinguishes_relay_from_partner() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (handler, _events) = ChannelHandler::new();
    client.connect("123456", handler).unwrap();

    let err = client
        .await_confirmation(Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Connection(ConnectionError::ConfirmTimeout {
            reached_relay: true,
            ..
        })
    ));
    assert!(!client.state().is_active());

    let offline = RelayClient::new(config(&closed_port_url().await));
    let (handler, _events) = ChannelHandler::new();
    offline.connect("123456", handler).unwrap();
    let err = offline
        .await_confirmation(Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Connection(ConnectionError::ConfirmTimeout {
            reached_relay: false,
            ..
        })
    ));
}

#[tokio::test]
async fn heartbeat_pings_while_open() {
    let relay = MockRelay::start().await;
    let mut fast = config(relay.url());
    fast.heartbeat_interval_ms = 50;
    let client = RelayClient::new(fast);
    let (handler, _events) = ChannelHandler::new();

    client.connect("123456", handler).unwrap();
    let request = relay.next_frame(WAIT).await.unwrap();
    assert_eq!(request["type"], "connection_request");
    let ping = relay.next_frame(WAIT).await.unwrap();
    assert_eq!(ping["type"], "ping");
    assert!(ping["ts"].as_i64().is_some());

    client.disconnect();
}

#[tokio::test]
async fn replaced_handler_receives_later_frames() {
    let relay = MockRelay::start().await;
    let client = RelayClient::new(config(relay.url()));
    let (first, mut first_events) = ChannelHandler::new();
    let (second, mut second_events) = ChannelHandler::new();

    assert!(!client.set_handler(second.clone()));
    client.connect("123456", first).unwrap();
    assert_eq!(next_event(&mut first_events).await, RelayEvent::Open);
    assert!(client.set_handler(second));

    relay.send(json!({"type": "note"}));
    assert_eq!(
        next_event(&mut second_events).await,
        RelayEvent::Message(json!({"type": "note"}))
    );
    assert!(first_events.try_recv().is_err());
}
