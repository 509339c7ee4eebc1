use travelplan_core::db::migrations::latest_version;
use travelplan_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "places");
    assert_table_exists(&conn, "travel_projects");
    assert_table_exists(&conn, "travel_project_places");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("travelplan.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "travel_projects");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_eleventh_association_and_duplicate_pairs() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name) VALUES ('u1', 'a@b.io', 'A', 'B');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO travel_projects (id, owner_id, name) VALUES ('p1', 'u1', 'Raw');",
        [],
    )
    .unwrap();
    for place_id in 1..=11_i64 {
        conn.execute(
            "INSERT INTO places (id, title) VALUES (?1, 'place');",
            [place_id],
        )
        .unwrap();
    }
    for place_id in 1..=10_i64 {
        conn.execute(
            "INSERT INTO travel_project_places (id, project_id, place_id) VALUES (?1, 'p1', ?2);",
            params![format!("a{place_id}"), place_id],
        )
        .unwrap();
    }

    let over_cap = conn
        .execute(
            "INSERT INTO travel_project_places (id, project_id, place_id) VALUES ('a11', 'p1', 11);",
            [],
        )
        .unwrap_err();
    assert!(over_cap.to_string().contains("project_place_limit"));

    conn.execute("DELETE FROM travel_project_places WHERE id = 'a10';", [])
        .unwrap();
    let duplicate = conn
        .execute(
            "INSERT INTO travel_project_places (id, project_id, place_id) VALUES ('dup', 'p1', 1);",
            [],
        )
        .unwrap_err();
    assert!(duplicate.to_string().contains("UNIQUE"));
}

#[test]
fn deleting_project_cascades_to_associations() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, email, first_name, last_name) VALUES ('u1', 'a@b.io', 'A', 'B');
         INSERT INTO places (id, title) VALUES (1, 'place');
         INSERT INTO travel_projects (id, owner_id, name) VALUES ('p1', 'u1', 'Raw');
         INSERT INTO travel_project_places (id, project_id, place_id) VALUES ('a1', 'p1', 1);
         DELETE FROM travel_projects WHERE id = 'p1';",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM travel_project_places;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(remaining, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
