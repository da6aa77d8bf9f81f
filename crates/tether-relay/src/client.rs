// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay link manager.
//!
//! One [`RelayClient`] owns at most one socket at a time. Every socket gets a
//! generation number when it is opened; events from a socket whose generation
//! no longer matches the current session are dropped, so a late close from a
//! replaced or intentionally closed socket can never schedule a reconnect.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tether_config::RelayConfig;
use tether_core::{now_millis, ConnectionError, ConnectionState, TetherError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::code::PairingCode;
use crate::frames::{self, ControlFrame};
use crate::handler::{CloseInfo, RelayHandler};

/// Upper bound on flushing a closing handshake before the socket is dropped.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// What happened to a frame passed to [`RelayClient::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open socket.
    Transmitted,
    /// Held in memory; flushed in order right after the next socket opens.
    Queued,
}

/// Pairs with a desktop companion through the relay and keeps the link up.
///
/// Not `Clone`: dropping the client tears the link down. Share it behind an
/// `Arc` when several tasks need it. All methods that may open a socket must
/// be called from inside a Tokio runtime.
pub struct RelayClient {
    shared: Arc<Shared>,
}

struct Shared {
    config: RelayConfig,
    backoff: Backoff,
    inner: Mutex<Inner>,
    state: watch::Sender<ConnectionState>,
}

#[derive(Default)]
struct Inner {
    /// Generation of the most recently opened socket.
    generation: u64,
    session: Option<Session>,
    /// Consecutive failed attempts; reset once a socket opens.
    attempts: u32,
    /// A socket of the current session reached the relay at least once.
    reached_relay: bool,
    /// Frames sent while no socket was open.
    pending: VecDeque<Value>,
    reconnect: Option<JoinHandle<()>>,
    /// Generation of a socket closed by `disconnect()` whose close is in flight.
    closing: Option<u64>,
}

struct Session {
    generation: u64,
    code: PairingCode,
    handler: Arc<dyn RelayHandler>,
    link: Link,
}

enum Link {
    /// No socket. A reconnect may be scheduled.
    Idle,
    Opening,
    Open(mpsc::UnboundedSender<Message>),
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Self {
        let backoff = Backoff::from_config(&config);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                backoff,
                inner: Mutex::new(Inner::default()),
                state,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.shared.config
    }

    /// Open a link for `code`.
    ///
    /// A malformed code is reported to `handler.on_error` and returned as
    /// [`ConnectionError::InvalidCode`]; no socket is opened. If a socket is
    /// already open or opening this is a no-op. A pending reconnect timer is
    /// superseded. Every later failure goes to the handler, never the caller.
    pub fn connect(&self, code: &str, handler: Arc<dyn RelayHandler>) -> Result<(), TetherError> {
        let code = match PairingCode::parse(code) {
            Ok(code) => code,
            Err(err) => {
                warn!(error = %err, "rejected pairing code");
                handler.on_error(&err);
                return Err(err.into());
            }
        };

        let mut inner = self.shared.lock();
        if let Some(session) = &inner.session {
            if !matches!(session.link, Link::Idle) {
                debug!(code = %session.code, "connect ignored: socket already open or opening");
                return Ok(());
            }
        }
        if let Some(timer) = inner.reconnect.take() {
            timer.abort();
        }
        inner.reached_relay = false;
        self.shared.start(&mut inner, code, handler);
        Ok(())
    }

    /// Transmit `message` if a socket is open, otherwise hold it in memory.
    ///
    /// Never fails. The in-memory queue is lost on process exit; callers that
    /// need durability route [`Delivery::Queued`] messages to the outbox.
    pub fn send(&self, message: Value) -> Delivery {
        let mut inner = self.shared.lock();
        if let Some(Session {
            link: Link::Open(outgoing),
            ..
        }) = &inner.session
        {
            if outgoing.send(Message::text(message.to_string())).is_ok() {
                return Delivery::Transmitted;
            }
        }
        inner.pending.push_back(message);
        debug!(queued = inner.pending.len(), "relay link down; frame queued");
        Delivery::Queued
    }

    /// Close the link on purpose. No reconnect follows.
    ///
    /// The state moves to `Closing` before the close frame is handed to the
    /// socket, and to `Disconnected` once the socket task winds down. The
    /// session's handler receives a clean close immediately and nothing after
    /// it. Frames still waiting in the in-memory queue are returned so the
    /// caller can persist them. Calling this repeatedly is harmless.
    pub fn disconnect(&self) -> Vec<Value> {
        let (session, unsent) = {
            let mut inner = self.shared.lock();
            if let Some(timer) = inner.reconnect.take() {
                timer.abort();
            }
            inner.attempts = 0;
            let unsent: Vec<Value> = inner.pending.drain(..).collect();
            let session = inner.session.take();
            match &session {
                Some(Session {
                    generation,
                    link: Link::Open(outgoing),
                    ..
                }) => {
                    self.shared.set_state(ConnectionState::Closing);
                    inner.closing = Some(*generation);
                    let _ = outgoing.send(Message::Close(Some(normal_close_frame())));
                }
                _ => self.shared.set_state(ConnectionState::Disconnected),
            }
            (session, unsent)
        };

        if let Some(session) = session {
            info!(code = %session.code, unsent = unsent.len(), "relay link closed by user");
            session.handler.on_close(&CloseInfo::user_disconnected());
        }
        unsent
    }

    /// Replace the handler of the current session. Returns `false` when
    /// there is no session.
    pub fn set_handler(&self, handler: Arc<dyn RelayHandler>) -> bool {
        match self.shared.lock().session.as_mut() {
            Some(session) => {
                session.handler = handler;
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.current_state()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Pairing code of the current session.
    pub fn code(&self) -> Option<String> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.code.to_string())
    }

    /// Frames waiting for the next socket.
    pub fn pending_frames(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.lock().attempts
    }

    /// Wait until the relay confirms a partner, for at most `timeout`.
    ///
    /// On timeout the link is disconnected and the error says whether the
    /// relay itself was reached, which separates "network problem" from
    /// "desktop companion not running".
    pub async fn await_confirmation(&self, timeout: Duration) -> Result<(), TetherError> {
        let mut state = self.subscribe();
        let confirmed = tokio::time::timeout(
            timeout,
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await;

        match confirmed {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(TetherError::Internal(
                "relay state channel closed".to_string(),
            )),
            Err(_) => {
                let reached_relay = self.shared.lock().reached_relay;
                let unsent = self.disconnect();
                let error = ConnectionError::ConfirmTimeout {
                    reached_relay,
                    after: timeout,
                };
                warn!(%error, unsent = unsent.len(), "no partner confirmation");
                Err(error.into())
            }
        }
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(timer) = inner.reconnect.take() {
            timer.abort();
        }
        // Dropping the session drops the writer channel; the socket task
        // sends a close frame and exits on its own.
        inner.session = None;
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            debug!(from = %state, to = %next, "relay state transition");
            *state = next;
            true
        });
    }

    /// Open a new socket for `code`. Caller holds the lock.
    fn start(
        self: &Arc<Self>,
        inner: &mut Inner,
        code: PairingCode,
        handler: Arc<dyn RelayHandler>,
    ) {
        inner.generation += 1;
        let generation = inner.generation;
        let url = code.relay_url(&self.config.url);
        info!(%code, generation, attempt = inner.attempts, "opening relay link");
        inner.session = Some(Session {
            generation,
            code,
            handler,
            link: Link::Opening,
        });
        self.set_state(ConnectionState::Connecting);
        tokio::spawn(run_socket(Arc::clone(self), generation, url));
    }

    /// Fired by the reconnect timer.
    fn reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.lock();
        inner.reconnect = None;
        let (code, handler) = match inner.session.as_ref() {
            Some(s) if s.generation == generation && matches!(s.link, Link::Idle) => {
                (s.code.clone(), Arc::clone(&s.handler))
            }
            _ => return,
        };
        self.start(&mut inner, code, handler);
    }

    /// Socket is up: send the connection request, flush the queue, and hand
    /// back the handler. `None` means the session moved on meanwhile.
    fn socket_opened(
        &self,
        generation: u64,
        outgoing: mpsc::UnboundedSender<Message>,
    ) -> Option<Arc<dyn RelayHandler>> {
        let mut inner = self.lock();
        let Inner {
            session,
            pending,
            attempts,
            reached_relay,
            ..
        } = &mut *inner;
        let session = session.as_mut().filter(|s| s.generation == generation)?;

        let request = ControlFrame::ConnectionRequest {
            code: session.code.to_string(),
            ts: now_millis(),
        };
        let _ = outgoing.send(Message::text(request.to_text()));
        let flushed = pending.len();
        for frame in pending.drain(..) {
            let _ = outgoing.send(Message::text(frame.to_string()));
        }

        session.link = Link::Open(outgoing);
        *attempts = 0;
        *reached_relay = true;
        info!(code = %session.code, flushed, "relay socket open, connection request sent");
        Some(Arc::clone(&session.handler))
    }

    fn frame_received(&self, generation: u64, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "ignoring relay frame that is not JSON");
                return;
            }
        };

        let handler = {
            let inner = self.lock();
            let Some(session) = inner
                .session
                .as_ref()
                .filter(|s| s.generation == generation)
            else {
                return;
            };
            let connecting = self.current_state() == ConnectionState::Connecting;
            if connecting && frames::is_confirmation(&frame) {
                self.set_state(ConnectionState::Connected);
                info!(code = %session.code, "partner confirmed");
            }
            Arc::clone(&session.handler)
        };
        handler.on_message(frame);
    }

    /// The socket task stopped writing. Stop routing frames to it and put
    /// every frame it never wrote back at the head of the pending queue, in
    /// order, so the next socket sends them.
    fn detach(
        &self,
        generation: u64,
        unwritten: Option<Message>,
        rx: &mut mpsc::UnboundedReceiver<Message>,
    ) {
        let mut inner = self.lock();
        let current = inner
            .session
            .as_mut()
            .filter(|s| s.generation == generation && matches!(s.link, Link::Open(_)));
        let Some(session) = current else {
            return;
        };
        session.link = Link::Idle;
        rx.close();

        let reclaimed: Vec<Value> = unwritten
            .into_iter()
            .chain(std::iter::from_fn(|| rx.try_recv().ok()))
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str::<Value>(text.as_str()).ok(),
                _ => None,
            })
            .filter(|frame| !frames::is_connection_request(frame))
            .collect();
        if reclaimed.is_empty() {
            return;
        }
        warn!(generation, reclaimed = reclaimed.len(), "requeueing frames the socket never wrote");
        for frame in reclaimed.into_iter().rev() {
            inner.pending.push_front(frame);
        }
    }

    fn socket_closed(
        self: &Arc<Self>,
        generation: u64,
        mut close: CloseInfo,
        error: Option<ConnectionError>,
    ) {
        let (handler, error) = {
            let mut inner = self.lock();

            if inner.closing == Some(generation) {
                inner.closing = None;
                if self.current_state() == ConnectionState::Closing {
                    self.set_state(ConnectionState::Disconnected);
                }
                debug!(generation, "user-requested close completed");
                return;
            }

            let current = inner
                .session
                .as_ref()
                .is_some_and(|s| s.generation == generation);
            if !current {
                debug!(generation, "ignoring close of a replaced socket");
                return;
            }

            inner.attempts += 1;
            let attempt = inner.attempts;
            let delay = self.backoff.delay(attempt);
            close.reconnect_in = Some(delay);

            let handler = match inner.session.as_mut() {
                Some(session) => {
                    session.link = Link::Idle;
                    Arc::clone(&session.handler)
                }
                None => return,
            };

            let error = if close.was_clean {
                self.set_state(ConnectionState::Disconnected);
                info!(
                    close_code = close.code,
                    reason = %close.reason,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "relay closed the link, reconnect scheduled"
                );
                None
            } else {
                let error = error.unwrap_or_else(|| ConnectionError::AbnormalClose {
                    code: close.code,
                    reason: close.reason.clone(),
                });
                self.set_state(ConnectionState::Error);
                warn!(
                    %error,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "relay link lost, reconnect scheduled"
                );
                Some(error)
            };

            let shared = Arc::clone(self);
            inner.reconnect = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                shared.reconnect(generation);
            }));
            (handler, error)
        };

        if let Some(error) = &error {
            handler.on_error(error);
        }
        handler.on_close(&close);
    }
}

/// Drive one socket from open to close.
async fn run_socket(shared: Arc<Shared>, generation: u64, url: String) {
    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let message = e.to_string();
            let close = CloseInfo::abnormal(message.clone());
            shared.socket_closed(
                generation,
                close,
                Some(ConnectionError::Unreachable { url, message }),
            );
            return;
        }
    };

    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let Some(handler) = shared.socket_opened(generation, tx) else {
        debug!(generation, "socket opened after its session ended");
        let _ = sink.send(Message::Close(Some(normal_close_frame()))).await;
        return;
    };
    handler.on_open();
    drop(handler);

    let period = shared.config.heartbeat_interval();
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut unwritten = None;
    let close = loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else {
                    // Session dropped without an explicit close.
                    let _ = sink.send(Message::Close(Some(normal_close_frame()))).await;
                    break CloseInfo::user_disconnected();
                };
                let closing = matches!(message, Message::Close(_));
                let retry = matches!(message, Message::Text(_)).then(|| message.clone());
                if let Err(e) = sink.send(message).await {
                    unwritten = retry;
                    break CloseInfo::abnormal(e.to_string());
                }
                if closing {
                    break CloseInfo::user_disconnected();
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.frame_received(generation, text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => CloseInfo::clean(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseInfo::clean(CloseInfo::NO_STATUS, ""),
                    };
                }
                // Binary frames are not part of the protocol; pings are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => break CloseInfo::abnormal(e.to_string()),
                None => break CloseInfo::abnormal("connection dropped"),
            },
            _ = heartbeat.tick() => {
                let ping = ControlFrame::Ping { ts: now_millis() }.to_text();
                if let Err(e) = sink.send(Message::text(ping)).await {
                    break CloseInfo::abnormal(e.to_string());
                }
                debug!(generation, "heartbeat sent");
            }
        }
    };

    shared.detach(generation, unwritten, &mut rx);
    let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, sink.close()).await;
    shared.socket_closed(generation, close, None);
}

fn normal_close_frame() -> CloseFrame {
    CloseFrame {
        code: CloseCode::Normal,
        reason: "User disconnected".into(),
    }
}
