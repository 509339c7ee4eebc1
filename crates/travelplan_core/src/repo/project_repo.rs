//! Travel project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level primitives over `travel_projects` and
//!   `travel_project_places`.
//! - Expose an atomic unit of work so the consistency engine can check and
//!   write under one write lock.
//!
//! # Invariants
//! - This layer never derives `completed`; it only stores what the engine
//!   decides via `set_project_completed`.
//! - Association listing is deterministic: insertion order.
//! - Deleting a project cascades to its associations (`foreign_keys=ON`).

use crate::model::place::PlaceId;
use crate::model::project::{
    ProjectId, ProjectPatch, ProjectPlaceId, ProjectPlacePatch, TravelProject, TravelProjectPlace,
};
use crate::model::user::UserId;
use crate::repo::{
    bool_to_int, classify_constraint, ensure_connection_ready, parse_flag, parse_uuid,
    with_immediate_tx, PageQuery, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    description,
    start_date,
    completed,
    created_at,
    updated_at
FROM travel_projects";

const PROJECT_PLACE_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    place_id,
    notes,
    visited,
    created_at,
    updated_at
FROM travel_project_places";

/// Repository interface for projects and their place associations.
pub trait ProjectRepository {
    /// Runs `work` as one atomic unit with the store write-locked.
    ///
    /// Every call `work` makes on the repository joins the same transaction;
    /// an `Err` from `work` rolls all of them back.
    fn transaction<T, E>(&self, work: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;

    /// Inserts a project with no places (`completed = true`).
    fn insert_project(
        &self,
        owner_id: UserId,
        name: &str,
        description: Option<&str>,
        start_date: Option<NaiveDate>,
    ) -> RepoResult<TravelProject>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<TravelProject>>;
    /// Lists one owner's projects, newest first.
    fn list_projects(&self, owner_id: UserId, query: &PageQuery)
        -> RepoResult<Vec<TravelProject>>;
    /// Applies owner-editable fields. Never touches `completed`.
    fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> RepoResult<()>;
    fn set_project_completed(&self, id: ProjectId, completed: bool) -> RepoResult<()>;
    /// Deletes the project and, by cascade, its associations.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;

    /// Returns the subset of `ids` that reference stored places.
    fn existing_place_ids(&self, ids: &[PlaceId]) -> RepoResult<BTreeSet<PlaceId>>;

    fn insert_project_place(
        &self,
        project_id: ProjectId,
        place_id: PlaceId,
    ) -> RepoResult<TravelProjectPlace>;
    fn get_project_place(&self, id: ProjectPlaceId) -> RepoResult<Option<TravelProjectPlace>>;
    fn list_project_places(&self, project_id: ProjectId) -> RepoResult<Vec<TravelProjectPlace>>;
    fn update_project_place(&self, id: ProjectPlaceId, patch: &ProjectPlacePatch)
        -> RepoResult<()>;
    fn delete_project_place(&self, id: ProjectPlaceId) -> RepoResult<()>;

    fn count_project_places(&self, project_id: ProjectId) -> RepoResult<usize>;
    fn count_visited_places(&self, project_id: ProjectId) -> RepoResult<usize>;
    fn project_place_exists(&self, project_id: ProjectId, place_id: PlaceId) -> RepoResult<bool>;
    fn has_unvisited_places(&self, project_id: ProjectId) -> RepoResult<bool>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["users", "places", "travel_projects", "travel_project_places"],
        )?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn transaction<T, E>(&self, work: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        with_immediate_tx(self.conn, || work(self))
    }

    fn insert_project(
        &self,
        owner_id: UserId,
        name: &str,
        description: Option<&str>,
        start_date: Option<NaiveDate>,
    ) -> RepoResult<TravelProject> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO travel_projects (
                    id,
                    owner_id,
                    name,
                    description,
                    start_date,
                    completed
                ) VALUES (?1, ?2, ?3, ?4, ?5, 1);",
                params![
                    id.to_string(),
                    owner_id.to_string(),
                    name,
                    description,
                    start_date,
                ],
            )
            .map_err(classify_constraint)?;

        self.get_project(id)?
            .ok_or_else(|| RepoError::not_found("travel project", id))
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<TravelProject>> {
        self.conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_projects(
        &self,
        owner_id: UserId,
        query: &PageQuery,
    ) -> RepoResult<Vec<TravelProject>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3;"
        ))?;
        let mut rows = stmt.query(params![
            owner_id.to_string(),
            i64::from(query.applied_limit()),
            i64::from(query.offset),
        ])?;

        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> RepoResult<()> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.push("description = ?");
            bind_values.push(optional_text(description.clone()));
        }
        if let Some(start_date) = patch.start_date.as_ref() {
            assignments.push("start_date = ?");
            bind_values.push(optional_text(
                start_date.map(|date| date.format("%Y-%m-%d").to_string()),
            ));
        }

        assignments.push("updated_at = (strftime('%s', 'now') * 1000)");
        let sql = format!(
            "UPDATE travel_projects SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(classify_constraint)?;
        if changed == 0 {
            return Err(RepoError::not_found("travel project", id));
        }
        Ok(())
    }

    fn set_project_completed(&self, id: ProjectId, completed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE travel_projects SET completed = ?2 WHERE id = ?1;",
            params![id.to_string(), bool_to_int(completed)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("travel project", id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM travel_projects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("travel project", id));
        }
        Ok(())
    }

    fn existing_place_ids(&self, ids: &[PlaceId]) -> RepoResult<BTreeSet<PlaceId>> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM places WHERE id IN ({placeholders});"
        ))?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        let mut found = BTreeSet::new();
        while let Some(row) = rows.next()? {
            found.insert(row.get::<_, PlaceId>(0)?);
        }
        Ok(found)
    }

    fn insert_project_place(
        &self,
        project_id: ProjectId,
        place_id: PlaceId,
    ) -> RepoResult<TravelProjectPlace> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO travel_project_places (
                    id,
                    project_id,
                    place_id,
                    notes,
                    visited
                ) VALUES (?1, ?2, ?3, NULL, 0);",
                params![id.to_string(), project_id.to_string(), place_id],
            )
            .map_err(classify_constraint)?;

        self.get_project_place(id)?
            .ok_or_else(|| RepoError::not_found("travel project place", id))
    }

    fn get_project_place(&self, id: ProjectPlaceId) -> RepoResult<Option<TravelProjectPlace>> {
        self.conn
            .query_row(
                &format!("{PROJECT_PLACE_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_project_place_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_project_places(&self, project_id: ProjectId) -> RepoResult<Vec<TravelProjectPlace>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_PLACE_SELECT_SQL}
             WHERE project_id = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;

        let mut places = Vec::new();
        while let Some(row) = rows.next()? {
            places.push(parse_project_place_row(row)?);
        }
        Ok(places)
    }

    fn update_project_place(
        &self,
        id: ProjectPlaceId,
        patch: &ProjectPlacePatch,
    ) -> RepoResult<()> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(notes) = patch.notes.as_ref() {
            assignments.push("notes = ?");
            bind_values.push(optional_text(notes.clone()));
        }
        if let Some(visited) = patch.visited {
            assignments.push("visited = ?");
            bind_values.push(Value::Integer(bool_to_int(visited)));
        }

        assignments.push("updated_at = (strftime('%s', 'now') * 1000)");
        let sql = format!(
            "UPDATE travel_project_places SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::not_found("travel project place", id));
        }
        Ok(())
    }

    fn delete_project_place(&self, id: ProjectPlaceId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM travel_project_places WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("travel project place", id));
        }
        Ok(())
    }

    fn count_project_places(&self, project_id: ProjectId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM travel_project_places WHERE project_id = ?1;",
            [project_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn count_visited_places(&self, project_id: ProjectId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM travel_project_places
             WHERE project_id = ?1
               AND visited = 1;",
            [project_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn project_place_exists(&self, project_id: ProjectId, place_id: PlaceId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM travel_project_places
                WHERE project_id = ?1
                  AND place_id = ?2
            );",
            params![project_id.to_string(), place_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn has_unvisited_places(&self, project_id: ProjectId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM travel_project_places
                WHERE project_id = ?1
                  AND visited = 0
            );",
            [project_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn optional_text(value: Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text),
        None => Value::Null,
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<TravelProject> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("owner_id")?;

    Ok(TravelProject {
        id: parse_uuid(&id_text, "travel_projects.id")?,
        owner_id: parse_uuid(&owner_text, "travel_projects.owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        completed: parse_flag(row.get("completed")?, "travel_projects.completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_project_place_row(row: &Row<'_>) -> RepoResult<TravelProjectPlace> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;

    Ok(TravelProjectPlace {
        id: parse_uuid(&id_text, "travel_project_places.id")?,
        project_id: parse_uuid(&project_text, "travel_project_places.project_id")?,
        place_id: row.get("place_id")?,
        notes: row.get("notes")?,
        visited: parse_flag(row.get("visited")?, "travel_project_places.visited")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
