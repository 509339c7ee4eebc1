//! Place repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide get-or-create persistence for catalog ingestion.
//! - Serve paginated place listings.
//!
//! # Invariants
//! - `get_or_create_place` never overwrites an existing title.

use crate::model::place::{Place, PlaceId};
use crate::repo::{ensure_connection_ready, PageQuery, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PLACE_SELECT_SQL: &str = "SELECT
    id,
    title,
    created_at,
    updated_at
FROM places";

/// Repository interface for catalog places.
pub trait PlaceRepository {
    /// Inserts the place when `id` is unknown. Returns the stored row and
    /// whether it was created by this call.
    fn get_or_create_place(&self, id: PlaceId, title: &str) -> RepoResult<(Place, bool)>;
    fn get_place(&self, id: PlaceId) -> RepoResult<Option<Place>>;
    fn list_places(&self, query: &PageQuery) -> RepoResult<Vec<Place>>;
    fn count_places(&self) -> RepoResult<u64>;
}

/// SQLite-backed place repository.
pub struct SqlitePlaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlaceRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["places"])?;
        Ok(Self { conn })
    }
}

impl PlaceRepository for SqlitePlaceRepository<'_> {
    fn get_or_create_place(&self, id: PlaceId, title: &str) -> RepoResult<(Place, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO places (id, title)
             VALUES (?1, ?2)
             ON CONFLICT(id) DO NOTHING;",
            params![id, title],
        )?;

        let place = self
            .get_place(id)?
            .ok_or_else(|| RepoError::not_found("place", id))?;
        Ok((place, inserted == 1))
    }

    fn get_place(&self, id: PlaceId) -> RepoResult<Option<Place>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PLACE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_place_row(row)?));
        }
        Ok(None)
    }

    fn list_places(&self, query: &PageQuery) -> RepoResult<Vec<Place>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PLACE_SELECT_SQL}
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![
            i64::from(query.applied_limit()),
            i64::from(query.offset)
        ])?;

        let mut places = Vec::new();
        while let Some(row) = rows.next()? {
            places.push(parse_place_row(row)?);
        }
        Ok(places)
    }

    fn count_places(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM places;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn parse_place_row(row: &Row<'_>) -> RepoResult<Place> {
    Ok(Place {
        id: row.get("id")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
