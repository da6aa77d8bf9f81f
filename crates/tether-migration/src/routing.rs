// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Whether records in `current` should move to the detected `target`.
///
/// Only the hub container routes; a container never routes to itself.
pub fn should_route(current: &str, target: Option<&str>, current_is_hub: bool) -> bool {
    match target {
        Some(target) => current_is_hub && current != target,
        None => false,
    }
}
