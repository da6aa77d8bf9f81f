// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay link manager for the Tether sync core.
//!
//! Opens a WebSocket to `{relay}/{code}`, announces itself with a
//! connection request, keeps the socket alive with periodic pings, and
//! reconnects with capped exponential backoff after unexpected closes.
//! Intentional disconnects never reconnect.

pub mod backoff;
pub mod client;
pub mod code;
pub mod frames;
pub mod handler;

pub use backoff::Backoff;
pub use client::{Delivery, RelayClient};
pub use code::PairingCode;
pub use handler::{ChannelHandler, CloseInfo, RelayEvent, RelayHandler};
