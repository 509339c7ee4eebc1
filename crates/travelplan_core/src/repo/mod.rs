//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//! - Translate constraint failures into semantic conflicts.
//!
//! # Invariants
//! - Repositories are constructed only over connections migrated to
//!   `latest_version()`.
//! - Repository APIs return `Ok(None)` for missing rows on reads and
//!   `RepoError::NotFound` when a write matched nothing.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

pub mod place_repo;
pub mod project_repo;
pub mod user_repo;

const PAGE_DEFAULT_LIMIT: u32 = 20;
const PAGE_LIMIT_MAX: u32 = 100;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-level conflicts surfaced by unique constraints and triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    ProjectName,
    ProjectPlacePair,
    ProjectPlaceLimit,
    UserEmail,
}

/// Repository error shared by all SQLite repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("constraint conflict: {0:?}")]
    Conflict(Conflict),
    #[error("repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Pagination options shared by list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl PageQuery {
    pub fn applied_limit(&self) -> u32 {
        normalize_page_limit(self.limit)
    }
}

/// Normalizes list limit according to the pagination contract.
pub fn normalize_page_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => PAGE_DEFAULT_LIMIT,
        Some(value) if value > PAGE_LIMIT_MAX => PAGE_LIMIT_MAX,
        Some(value) => value,
    }
}

/// Runs `work` inside an immediate transaction on `conn`.
///
/// The write lock is taken before `work` runs, so reads performed by `work`
/// see a state no other writer can change until commit. Any error rolls the
/// whole transaction back.
pub(crate) fn with_immediate_tx<T, E>(
    conn: &Connection,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<RepoError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(RepoError::from)?;
    let value = work()?;
    tx.commit().map_err(RepoError::from)?;
    Ok(value)
}

/// Maps SQLite constraint failures to semantic conflicts.
pub(crate) fn classify_constraint(err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            let conflict = if message.contains("project_place_limit") {
                Some(Conflict::ProjectPlaceLimit)
            } else if message.contains("travel_project_places.project_id") {
                Some(Conflict::ProjectPlacePair)
            } else if message.contains("travel_projects.name") {
                Some(Conflict::ProjectName)
            } else if message.contains("users.email") {
                Some(Conflict::UserEmail)
            } else {
                None
            };
            if let Some(conflict) = conflict {
                return RepoError::Conflict(conflict);
            }
        }
    }
    err.into()
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_page_limit;

    #[test]
    fn page_limit_defaults_and_clamps() {
        assert_eq!(normalize_page_limit(None), 20);
        assert_eq!(normalize_page_limit(Some(0)), 20);
        assert_eq!(normalize_page_limit(Some(7)), 7);
        assert_eq!(normalize_page_limit(Some(500)), 100);
    }
}
