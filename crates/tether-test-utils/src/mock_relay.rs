// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process relay server for link tests.
//!
//! `MockRelay` listens on an ephemeral localhost port, accepts WebSocket
//! upgrades on any path, records every JSON text frame clients send, and lets
//! a test push frames to, cleanly close, or abruptly drop the most recent
//! connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

enum Command {
    Send(Value),
    Close { code: u16, reason: String },
    Drop,
}

#[derive(Default)]
struct State {
    accepted: AtomicUsize,
    paths: Mutex<Vec<String>>,
    current: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    closes_received: AtomicUsize,
}

/// A local relay double.
pub struct MockRelay {
    url: String,
    state: Arc<State>,
    frames: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
    accept_task: JoinHandle<()>,
}

impl MockRelay {
    /// Start a relay that never confirms a partner on its own.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Start a relay that answers every `connection_request` with a
    /// `partner_connected` frame.
    pub async fn start_confirming() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(confirm: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock relay");
        let addr = listener.local_addr().expect("mock relay address");
        let state = Arc::new(State::default());
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let paths = Arc::clone(&accept_state);
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    paths
                        .paths
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(req.uri().path().to_string());
                    Ok(resp)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                accept_state.accepted.fetch_add(1, Ordering::SeqCst);
                let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
                *accept_state
                    .current
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(cmd_tx);
                tokio::spawn(serve_connection(
                    ws,
                    cmd_rx,
                    frames_tx.clone(),
                    Arc::clone(&accept_state),
                    confirm,
                ));
            }
        });

        Self {
            url: format!("ws://{addr}"),
            state,
            frames: tokio::sync::Mutex::new(frames_rx),
            accept_task,
        }
    }

    /// Base URL to configure the client with (no trailing slash).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Completed WebSocket handshakes so far.
    pub fn accept_count(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Request paths of every accepted connection, in order.
    pub fn paths(&self) -> Vec<String> {
        self.state
            .paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close frames received from clients.
    pub fn closes_received(&self) -> usize {
        self.state.closes_received.load(Ordering::SeqCst)
    }

    /// Next JSON frame from any client, or `None` after `timeout`.
    pub async fn next_frame(&self, timeout: Duration) -> Option<Value> {
        let mut frames = self.frames.lock().await;
        tokio::time::timeout(timeout, frames.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next frame whose `type` is not `ping`.
    pub async fn next_non_ping(&self, timeout: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let frame = self.next_frame(remaining).await?;
            if frame.get("type").and_then(Value::as_str) != Some("ping") {
                return Some(frame);
            }
        }
    }

    /// Wait until at least `n` connections were accepted.
    pub async fn wait_for_connections(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.accept_count() < n {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Push a frame to the most recent connection.
    pub fn send(&self, frame: Value) {
        self.command(Command::Send(frame));
    }

    /// Push a `partner_connected` confirmation to the most recent connection.
    pub fn confirm(&self) {
        self.send(json!({"type": "partner_connected"}));
    }

    /// Close the most recent connection with a proper closing handshake.
    pub fn close(&self, code: u16, reason: &str) {
        self.command(Command::Close {
            code,
            reason: reason.to_string(),
        });
    }

    /// Drop the most recent connection without a close frame.
    pub fn drop_connection(&self) {
        self.command(Command::Drop);
    }

    fn command(&self, command: Command) {
        if let Some(tx) = self
            .state
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = tx.send(command);
        }
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    frames: mpsc::UnboundedSender<Value>,
    state: Arc<State>,
    confirm: bool,
) {
    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if sink.send(Message::text(frame.to_string())).await.is_err() {
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    let _ = sink.flush().await;
                    // Let the client complete the handshake.
                    while let Some(Ok(_)) = source.next().await {}
                    return;
                }
                Some(Command::Drop) | None => return,
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let is_request =
                        frame.get("type").and_then(Value::as_str) == Some("connection_request");
                    let _ = frames.send(frame);
                    if confirm && is_request {
                        let reply = json!({"type": "partner_connected"}).to_string();
                        if sink.send(Message::text(reply)).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    state.closes_received.fetch_add(1, Ordering::SeqCst);
                    let _ = sink.close().await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return,
            },
        }
    }
}
