//! User repository contracts and SQLite implementation.

use crate::model::user::{NewUser, User, UserId};
use crate::repo::{classify_constraint, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    first_name,
    last_name,
    created_at,
    updated_at
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    /// Persists an already-normalized registration.
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }

    fn query_one(&self, filter: &str, value: String) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE {filter};"),
                [value],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO users (id, email, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    user.email.as_str(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                ],
            )
            .map_err(classify_constraint)?;

        self.get_user(id)?
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.query_one("id = ?1", id.to_string())
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.query_one("email = ?1 COLLATE NOCASE", email.trim().to_string())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
