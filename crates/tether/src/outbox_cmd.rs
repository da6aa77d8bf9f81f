// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether queue` and `tether outbox ...`.

use serde::Serialize;
use tether_config::OutboxConfig;
use tether_core::{NewMessage, QueuedMessage, SyncMetadata, TetherError};
use tether_outbox::Outbox;

/// Snapshot printed by `tether outbox status`.
#[derive(Debug, Serialize)]
pub struct OutboxStatus {
    pub pending: usize,
    pub capacity: usize,
    pub images: usize,
    pub primary_available: bool,
    pub sync: Option<SyncMetadata>,
}

pub async fn run_queue(
    config: &OutboxConfig,
    container_id: String,
    content: String,
    image_url: Option<String>,
) -> Result<String, TetherError> {
    let outbox = Outbox::open(config).await;
    let result = outbox
        .enqueue(NewMessage {
            container_id,
            content,
            image_url,
        })
        .await;
    outbox.close().await?;
    result
}

pub async fn run_list(config: &OutboxConfig) -> Result<Vec<QueuedMessage>, TetherError> {
    let outbox = Outbox::open(config).await;
    let pending = outbox.list_pending().await;
    outbox.close().await?;
    Ok(pending)
}

pub async fn run_clear(config: &OutboxConfig) -> Result<(), TetherError> {
    let outbox = Outbox::open(config).await;
    outbox.clear().await;
    outbox.clear_images().await;
    outbox.close().await
}

pub async fn run_status(config: &OutboxConfig) -> Result<OutboxStatus, TetherError> {
    let outbox = Outbox::open(config).await;
    let status = OutboxStatus {
        pending: outbox.pending_count().await,
        capacity: outbox.capacity(),
        images: outbox.pending_images().await.len(),
        primary_available: outbox.is_primary_available(),
        sync: outbox.sync_metadata().await,
    };
    outbox.close().await?;
    Ok(status)
}

pub fn print_list(pending: &[QueuedMessage]) {
    if pending.is_empty() {
        println!("outbox is empty");
        return;
    }
    for message in pending {
        let image = if message.image_url.is_some() { " [image]" } else { "" };
        println!(
            "{}  {}  {}{}",
            message.id, message.container_id, message.content, image
        );
    }
}

pub fn print_status(status: &OutboxStatus) {
    println!("pending:  {}/{}", status.pending, status.capacity);
    println!("images:   {}", status.images);
    println!(
        "storage:  {}",
        if status.primary_available {
            "sqlite + fallback"
        } else {
            "fallback only"
        }
    );
    match &status.sync {
        Some(sync) => {
            println!("last sync attempt:    {}", sync.last_sync_attempt);
            println!("last successful sync: {}", sync.last_successful_sync);
        }
        None => println!("never synced"),
    }
}
