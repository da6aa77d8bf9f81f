// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per stored entity.

pub mod containers;
pub mod images;
pub mod messages;
pub mod sync_meta;
