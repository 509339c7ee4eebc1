//! Ordered schema migrations for the travel planner store.
//!
//! # Responsibility
//! - List every schema step with a stable version and name.
//! - Bring a connection from its recorded version up to `latest_version()`.
//!
//! # Invariants
//! - Versions are contiguous from 1; `PRAGMA user_version` holds the last
//!   applied one.
//! - Pending steps run under one write-locked transaction, and the recorded
//!   version is re-read inside it, so two processes opening a fresh file do
//!   not both migrate it.
//! - A store recorded at a newer version than this binary knows is refused.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "project_place_limit",
        sql: include_str!("0002_project_place_limit.sql"),
    },
];

/// Outcome of one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Names of the steps applied by this run, oldest first.
    pub applied: Vec<&'static str>,
}

/// Schema version this binary migrates to.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Applies every step newer than the store's recorded version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from_version = recorded_version(&tx)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let mut applied = Vec::new();
    for step in MIGRATIONS.iter().skip(from_version as usize) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
        applied.push(step.name);
    }
    tx.commit()?;

    if !applied.is_empty() {
        info!(
            "event=db_migrate module=db status=ok from_version={from_version} to_version={latest} steps={}",
            applied.len()
        );
    }
    Ok(MigrationReport {
        from_version,
        to_version: latest,
        applied,
    })
}

fn recorded_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, recorded_version, MIGRATIONS};
    use rusqlite::Connection;

    fn trigger_exists(conn: &Connection) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'trigger' AND name = 'trg_travel_project_places_limit');",
            [],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn versions_are_contiguous_and_names_unique() {
        for (index, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1);
            assert_eq!(
                MIGRATIONS.iter().filter(|other| other.name == step.name).count(),
                1
            );
        }
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn fresh_store_gets_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();

        let first = apply_migrations(&mut conn).unwrap();
        assert_eq!(first.from_version, 0);
        assert_eq!(first.applied, vec!["init", "project_place_limit"]);

        let second = apply_migrations(&mut conn).unwrap();
        assert_eq!(second.from_version, latest_version());
        assert!(second.applied.is_empty());
    }

    #[test]
    fn partially_migrated_store_resumes_at_next_step() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        assert!(!trigger_exists(&conn));

        let report = apply_migrations(&mut conn).unwrap();

        assert_eq!(report.applied, vec!["project_place_limit"]);
        assert_eq!(recorded_version(&conn).unwrap(), 2);
        assert!(trigger_exists(&conn));
    }
}
