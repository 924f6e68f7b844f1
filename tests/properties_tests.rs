//! Invariant tests: the properties the on-disk layout guarantees after
//! any successful operation.

use csvgres::{Csvgres, EngineError, TableMetadata, Value};
use std::path::PathBuf;
use tempfile::TempDir;

async fn engine() -> (TempDir, Csvgres) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Csvgres::new(dir.path());
    engine.init().await.expect("init");
    engine
        .create_database("CREATE DATABASE testdb")
        .await
        .expect("create database");
    (dir, engine)
}

fn csv_path(dir: &TempDir, table: &str) -> PathBuf {
    dir.path()
        .join("testdb")
        .join("tables")
        .join(format!("{}.csv", table))
}

fn meta_path(dir: &TempDir, table: &str) -> PathBuf {
    dir.path()
        .join("testdb")
        .join(".metadata")
        .join(format!("{}.json", table))
}

#[tokio::test]
async fn test_schema_csv_coherence() {
    let (dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE t (zebra INT, apple TEXT, mango BOOLEAN)",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert("INSERT INTO t VALUES (1, 'a', true)", Some("testdb"))
        .await
        .unwrap();

    let metadata: TableMetadata =
        serde_json::from_str(&std::fs::read_to_string(meta_path(&dir, "t")).unwrap()).unwrap();
    let csv = std::fs::read_to_string(csv_path(&dir, "t")).unwrap();
    let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
    assert_eq!(header, metadata.column_names());
}

#[tokio::test]
async fn test_type_soundness_on_reread() {
    let (_dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE t (id INT, score DECIMAL, active BOOLEAN, name TEXT)",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert(
            "INSERT INTO t VALUES (7, 2.5, true, 'a, \"quoted\" name')",
            Some("testdb"),
        )
        .await
        .unwrap();

    let first = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    let second = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0]["id"], Value::Int(7));
    assert_eq!(first[0]["score"], Value::Float(2.5));
    assert_eq!(first[0]["active"], Value::Bool(true));
    assert_eq!(
        first[0]["name"],
        Value::Text("a, \"quoted\" name".to_string())
    );
}

#[tokio::test]
async fn test_serial_monotonicity() {
    let (dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE t (id SERIAL DEFAULT 10, name TEXT)",
            Some("testdb"),
        )
        .await
        .unwrap();

    for name in ["a", "b", "c", "d"] {
        engine
            .insert(
                &format!("INSERT INTO t VALUES ('{}')", name),
                Some("testdb"),
            )
            .await
            .unwrap();
    }

    let rows = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    let ids: Vec<Value> = rows.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(
        ids,
        vec![Value::Int(10), Value::Int(11), Value::Int(12), Value::Int(13)]
    );

    // The persisted counter stays strictly above the maximum assigned id.
    let metadata: TableMetadata =
        serde_json::from_str(&std::fs::read_to_string(meta_path(&dir, "t")).unwrap()).unwrap();
    assert_eq!(metadata.columns["id"].auto_increment_counter, Some(14));
}

#[tokio::test]
async fn test_primary_key_violation_leaves_file_unchanged() {
    let (dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT, age INT)",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert("INSERT INTO users VALUES (1, 'John', 30)", Some("testdb"))
        .await
        .unwrap();

    let before = std::fs::read(csv_path(&dir, "users")).unwrap();
    let err = engine
        .insert("INSERT INTO users VALUES (1, 'Jane', 29)", Some("testdb"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));
    let after = std::fs::read(csv_path(&dir, "users")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_primary_key_rejects_null() {
    let (_dir, engine) = engine().await;
    engine
        .create_table("CREATE TABLE t (id INT PRIMARY KEY)", Some("testdb"))
        .await
        .unwrap();
    let err = engine
        .insert("INSERT INTO t VALUES (NULL)", Some("testdb"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));
}

#[tokio::test]
async fn test_unique_allows_distinct_nulls() {
    let (_dir, engine) = engine().await;
    engine
        .create_table("CREATE TABLE t (id INT, email TEXT UNIQUE)", Some("testdb"))
        .await
        .unwrap();
    engine
        .insert("INSERT INTO t VALUES (1, NULL)", Some("testdb"))
        .await
        .unwrap();
    engine
        .insert("INSERT INTO t VALUES (2, NULL)", Some("testdb"))
        .await
        .unwrap();

    let err = engine
        .insert("INSERT INTO t VALUES (3, NULL), (4, 'x'), (5, 'x')", Some("testdb"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));
}

#[tokio::test]
async fn test_delete_insert_idempotence() {
    let (dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT)",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert("INSERT INTO users VALUES (1, 'John')", Some("testdb"))
        .await
        .unwrap();

    let before = std::fs::read(csv_path(&dir, "users")).unwrap();
    engine
        .insert("INSERT INTO users VALUES (2, 'Jane')", Some("testdb"))
        .await
        .unwrap();
    engine
        .delete_row("DELETE FROM users WHERE id = 2", Some("testdb"))
        .await
        .unwrap();
    let after = std::fs::read(csv_path(&dir, "users")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_delete_without_where_keeps_header() {
    let (dir, engine) = engine().await;
    engine
        .create_table("CREATE TABLE t (id INT, name TEXT)", Some("testdb"))
        .await
        .unwrap();
    engine
        .insert("INSERT INTO t VALUES (1, 'a'), (2, 'b')", Some("testdb"))
        .await
        .unwrap();

    engine.delete_row("DELETE FROM t", Some("testdb")).await.unwrap();

    let csv = std::fs::read_to_string(csv_path(&dir, "t")).unwrap();
    assert_eq!(csv, "id,name\n");
    let rows = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_array_append_is_idempotent() {
    let (_dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE projects (projectid TEXT, databases TEXT[])",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert("INSERT INTO projects (projectid) VALUES ('p')", Some("testdb"))
        .await
        .unwrap();

    for _ in 0..2 {
        engine
            .update_row(
                "UPDATE projects SET databases = databases || 'db1' WHERE projectid = 'p'",
                Some("testdb"),
            )
            .await
            .unwrap();
    }

    let rows = engine
        .select("SELECT * FROM projects", Some("testdb"))
        .await
        .unwrap();
    assert_eq!(rows[0]["databases"], Value::Array(vec!["db1".to_string()]));
}

#[tokio::test]
async fn test_array_append_then_remove_restores_state() {
    let (_dir, engine) = engine().await;
    engine
        .create_table(
            "CREATE TABLE projects (projectid TEXT, databases TEXT[])",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .insert("INSERT INTO projects (projectid) VALUES ('p')", Some("testdb"))
        .await
        .unwrap();
    engine
        .update_row(
            "UPDATE projects SET databases = databases || 'keep' WHERE projectid = 'p'",
            Some("testdb"),
        )
        .await
        .unwrap();

    let before = engine
        .select("SELECT * FROM projects", Some("testdb"))
        .await
        .unwrap();

    engine
        .update_row(
            "UPDATE projects SET databases = databases || 'gone' WHERE projectid = 'p'",
            Some("testdb"),
        )
        .await
        .unwrap();
    engine
        .update_row(
            "UPDATE projects SET databases = databases - 'gone' WHERE projectid = 'p'",
            Some("testdb"),
        )
        .await
        .unwrap();

    let after = engine
        .select("SELECT * FROM projects", Some("testdb"))
        .await
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(after[0]["databases"], Value::Array(vec!["keep".to_string()]));
}

#[tokio::test]
async fn test_array_default_is_fresh_empty_list() {
    let (_dir, engine) = engine().await;
    engine
        .create_table("CREATE TABLE t (id INT, tags TEXT[])", Some("testdb"))
        .await
        .unwrap();
    engine
        .insert("INSERT INTO t (id) VALUES (1), (2)", Some("testdb"))
        .await
        .unwrap();

    // Appending to one row must not leak into the other.
    engine
        .update_row("UPDATE t SET tags = tags || 'x' WHERE id = 1", Some("testdb"))
        .await
        .unwrap();
    let rows = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    assert_eq!(rows[0]["tags"], Value::Array(vec!["x".to_string()]));
    assert_eq!(rows[1]["tags"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_concurrent_inserts_are_last_writer_wins() {
    // No inter-statement locking: two interleaved INSERTs may lose one
    // another's rows, but the file always stays well-formed.
    let (dir, engine) = engine().await;
    engine
        .create_table("CREATE TABLE t (id INT, name TEXT)", Some("testdb"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        engine.insert("INSERT INTO t VALUES (1, 'a')", Some("testdb")),
        engine.insert("INSERT INTO t VALUES (2, 'b')", Some("testdb")),
    );
    a.unwrap();
    b.unwrap();

    let rows = engine
        .select("SELECT * FROM t", Some("testdb"))
        .await
        .unwrap();
    assert!(!rows.is_empty() && rows.len() <= 2);
    let csv = std::fs::read_to_string(csv_path(&dir, "t")).unwrap();
    assert!(csv.starts_with("id,name\n"));
}
