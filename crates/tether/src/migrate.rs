// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether migrate` and `tether containers`.

use std::sync::Arc;

use tether_config::TetherConfig;
use tether_core::{ContainerMap, RecordStore, TetherError};
use tether_migration::{MigrationCoordinator, MigrationOutcome};
use tether_storage::{Database, SqliteRecordStore};

pub async fn run_migrate(
    config: &TetherConfig,
    record_ids: &[String],
    from: &str,
    to: &str,
) -> Result<MigrationOutcome, TetherError> {
    let db = Database::open(&config.outbox.database_path).await?;
    let coordinator = MigrationCoordinator::new(
        Arc::new(SqliteRecordStore::new(db.clone())),
        &config.migration,
    );
    let outcome = coordinator.migrate_records(record_ids, from, to).await;
    drop(coordinator);
    db.close().await?;
    outcome
}

pub async fn run_containers(config: &TetherConfig) -> Result<ContainerMap, TetherError> {
    let db = Database::open(&config.outbox.database_path).await?;
    let containers = SqliteRecordStore::new(db.clone()).load_all(true).await;
    db.close().await?;
    containers
}

pub fn describe(outcome: &MigrationOutcome, from: &str, to: &str) -> String {
    match outcome {
        MigrationOutcome::Migrated {
            moved,
            duplicates_skipped,
        } if duplicates_skipped.is_empty() => {
            format!("moved {} record(s) from {from} to {to}", moved.len())
        }
        MigrationOutcome::Migrated {
            moved,
            duplicates_skipped,
        } => format!(
            "moved {} record(s) from {from} to {to}, {} already present",
            moved.len(),
            duplicates_skipped.len()
        ),
        MigrationOutcome::NothingToMove => format!("none of the records are in {from}"),
        MigrationOutcome::Skipped { key } => {
            format!("a migration between {key} is already running, skipped")
        }
    }
}

pub fn print_containers(containers: &ContainerMap) {
    if containers.is_empty() {
        println!("no containers");
        return;
    }
    for container in containers.values() {
        println!(
            "{}  {} record(s)  {}",
            container.id,
            container.records.len(),
            container.title
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_test_utils::container;

    async fn seeded_config(dir: &tempfile::TempDir) -> TetherConfig {
        let mut config = TetherConfig::default();
        config.outbox.database_path = dir.path().join("tether.db").to_string_lossy().into_owned();
        config.outbox.fallback_dir = dir.path().join("kv").to_string_lossy().into_owned();

        let db = Database::open(&config.outbox.database_path).await.unwrap();
        let store = SqliteRecordStore::new(db.clone());
        let mut map = ContainerMap::new();
        for c in [container("hub", &["m1", "m2"]), container("zelda", &["m3"])] {
            map.insert(c.id.clone(), c);
        }
        store.save_all(map).await.unwrap();
        db.close().await.unwrap();
        config
    }

    #[tokio::test]
    async fn migrate_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(&dir).await;
        let ids = vec!["m1".to_string(), "m9".to_string()];

        let outcome = run_migrate(&config, &ids, "hub", "zelda").await.unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                moved: vec!["m1".into()],
                duplicates_skipped: vec![],
            }
        );
        assert_eq!(
            describe(&outcome, "hub", "zelda"),
            "moved 1 record(s) from hub to zelda"
        );

        let containers = run_containers(&config).await.unwrap();
        assert_eq!(containers["hub"].record_ids(), ["m2"]);
        assert_eq!(containers["zelda"].record_ids(), ["m3", "m1"]);

        let again = run_migrate(&config, &ids, "hub", "zelda").await.unwrap();
        assert_eq!(again, MigrationOutcome::NothingToMove);
    }

    #[tokio::test]
    async fn missing_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(&dir).await;
        let err = run_migrate(&config, &["m1".to_string()], "hub", "mario")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("`mario`"));
    }
}
