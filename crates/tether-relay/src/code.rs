// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing code validation.

use std::fmt;

use tether_core::ConnectionError;

/// A validated six-digit pairing code shared between the client and the
/// desktop companion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingCode(String);

impl PairingCode {
    pub const LEN: usize = 6;

    /// Accept exactly six ASCII digits; anything else is a validation error.
    pub fn parse(code: &str) -> Result<Self, ConnectionError> {
        if code.len() == Self::LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(ConnectionError::InvalidCode {
                code: code.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Socket address for this code under the given relay base URL.
    pub fn relay_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
