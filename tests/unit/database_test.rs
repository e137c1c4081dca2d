//! Unit tests for the Smart Bookmark database layer (connection + migrations).

use smart_bookmark::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use smart_bookmark::database::Database;
use tempfile::TempDir;

fn table_exists(db: &Database, name: &str) -> bool {
    db.connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )
        .unwrap_or(false)
}

#[test]
fn test_open_in_memory_succeeds() {
    assert!(Database::open_in_memory().is_ok());
}

#[test]
fn test_migrations_create_session_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    for table in ["schema_version", "auth_session", "store_salt"] {
        assert!(table_exists(&db, table), "Table '{}' should exist after migrations", table);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(get_schema_version(&db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    run_all(&conn).unwrap();
    run_all(&conn).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_auth_session_holds_a_single_row() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    let other = conn.execute(
        "INSERT INTO auth_session (id, encrypted_data, iv, auth_tag, updated_at) VALUES ('other', x'00', x'00', x'00', 0)",
        [],
    );
    assert!(other.is_err(), "only the 'current' row is allowed");
}

#[test]
fn test_file_database_persists_across_opens() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("smart-bookmark.db");
    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute("INSERT INTO store_salt (id, salt) VALUES ('default', x'0102')", [])
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let salt: Vec<u8> = db
        .connection()
        .query_row("SELECT salt FROM store_salt WHERE id = 'default'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(salt, vec![1, 2]);
}
