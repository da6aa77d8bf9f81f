// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether pair`: hold a relay link open and drain the outbox into it.

use tether_config::TetherConfig;
use tether_core::{ConnectionState, TetherError};
use tether_outbox::Outbox;
use tether_relay::{ChannelHandler, RelayClient, RelayEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::drain;

/// Connect with `code`, wait for a partner, then print every inbound frame as
/// one JSON line on stdout until `cancel` fires.
///
/// The outbox is drained after the first confirmation and again each time
/// the link comes back. Queued frames the link never wrote are put back into
/// the outbox on exit.
pub async fn run_pair(
    config: &TetherConfig,
    code: &str,
    cancel: CancellationToken,
) -> Result<(), TetherError> {
    let outbox = Outbox::open(&config.outbox).await;
    let client = RelayClient::new(config.relay.clone());
    let (handler, mut events) = ChannelHandler::new();

    if let Err(e) = client.connect(code, handler) {
        outbox.close().await?;
        return Err(e);
    }
    eprintln!("tether: connecting to {} with code {code}", config.relay.url);

    let confirmed = tokio::select! {
        result = client.await_confirmation(config.relay.confirm_timeout()) => result,
        _ = cancel.cancelled() => {
            client.disconnect();
            return outbox.close().await;
        }
    };
    if let Err(e) = confirmed {
        outbox.close().await?;
        return Err(e);
    }
    eprintln!("tether: paired, press Ctrl+C to stop");

    let report = drain::drain_outbox(&client, &outbox).await;
    if report.sent > 0 {
        eprintln!("tether: delivered {} queued message(s)", report.sent);
    }

    let mut states = client.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                debug!(%state, "relay state changed");
                if state == ConnectionState::Connected {
                    drain::drain_outbox(&client, &outbox).await;
                }
            }
            event = events.recv() => match event {
                Some(RelayEvent::Message(frame)) => println!("{frame}"),
                Some(RelayEvent::Error(e)) => eprintln!("tether: {e}"),
                Some(RelayEvent::Close(close)) => match close.reconnect_in {
                    Some(delay) => eprintln!(
                        "tether: link closed ({}), reconnecting in {}ms",
                        close.code,
                        delay.as_millis()
                    ),
                    None => break,
                },
                Some(RelayEvent::Open) => {}
                None => break,
            },
        }
    }

    let unsent = client.disconnect();
    let requeued = drain::requeue_unsent(&outbox, unsent).await;
    info!(requeued, pending = outbox.pending_count().await, "pairing session ended");
    outbox.close().await
}
