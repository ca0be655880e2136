use iptrack_core::db::migrations::{current_version, latest_version};
use iptrack_core::db::{open_db, open_db_in_memory, DbError};
use iptrack_core::{RepoError, SqliteAssetRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "assets");
    assert_table_exists(&conn, "deadlines");
    assert_table_exists(&conn, "asset_id_sequences");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(current_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "assets");
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
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteAssetRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

#[test]
fn schema_refuses_window_after_due_date() {
    let conn = open_db_in_memory().unwrap();
    insert_bare_asset(&conn, "IP-2024-001");

    let result = conn.execute(
        "INSERT INTO deadlines (id, asset_id, position, kind, label, due_date, window_start)
         VALUES ('d1', 'IP-2024-001', 0, 'renewal', 'Renewal', '2024-02-15', '2024-02-16');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn schema_refuses_reopening_a_resolved_deadline() {
    let conn = open_db_in_memory().unwrap();
    insert_bare_asset(&conn, "IP-2024-001");
    conn.execute(
        "INSERT INTO deadlines (id, asset_id, position, kind, label, due_date, window_start, resolved)
         VALUES ('d1', 'IP-2024-001', 0, 'renewal', 'Renewal', '2024-02-15', '2024-01-16', 1);",
        [],
    )
    .unwrap();

    let result = conn.execute("UPDATE deadlines SET resolved = 0 WHERE id = 'd1';", []);
    assert!(result.is_err());

    let resolved: i64 = conn
        .query_row("SELECT resolved FROM deadlines WHERE id = 'd1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(resolved, 1);
}

#[test]
fn schema_refuses_deleting_assets() {
    let conn = open_db_in_memory().unwrap();
    insert_bare_asset(&conn, "IP-2024-001");

    let result = conn.execute("DELETE FROM assets WHERE id = 'IP-2024-001';", []);
    assert!(result.is_err());
}

#[test]
fn schema_refuses_moving_a_deadline_to_another_asset() {
    let conn = open_db_in_memory().unwrap();
    insert_bare_asset(&conn, "IP-2024-001");
    insert_bare_asset(&conn, "IP-2024-002");
    conn.execute(
        "INSERT INTO deadlines (id, asset_id, position, kind, label, due_date, window_start)
         VALUES ('d1', 'IP-2024-001', 0, 'renewal', 'Renewal', '2024-02-15', '2024-01-16');",
        [],
    )
    .unwrap();

    let result = conn.execute("UPDATE deadlines SET asset_id = 'IP-2024-002' WHERE id = 'd1';", []);
    assert!(result.is_err());
}

#[test]
fn failed_migration_names_the_script_and_keeps_the_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half_built.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 2;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match &err {
        DbError::Migration { version, name, .. } => {
            assert_eq!(*version, 3);
            assert_eq!(*name, "deadline_ownership");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("0003_deadline_ownership"));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_version(&conn).unwrap(), 2);
}

fn insert_bare_asset(conn: &Connection, id: &str) {
    conn.execute(
        "INSERT INTO assets (id, kind, title, status) VALUES (?1, 'patent', 'Sensor', 'draft');",
        [id],
    )
    .unwrap();
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
