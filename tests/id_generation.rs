//! Id allocation against the SQLite sequence store.
//!
//! Run with: cargo test --test id_generation

use std::collections::HashSet;
use std::sync::Arc;

use school_admin::config::{DatabaseBackend, DatabaseConfig};
use school_admin::infrastructure::id_generator::current_year;
use school_admin::infrastructure::{IdGenerator, SequenceStore, SqliteDatabase};
use tempfile::TempDir;

async fn in_memory_generator() -> IdGenerator {
    let db = SqliteDatabase::new_in_memory().await.unwrap();
    IdGenerator::new(Arc::new(db))
}

fn file_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite:{}", dir.path().join("school.db").display()),
        backend: DatabaseBackend::Sqlite,
        max_connections: 4,
        acquire_timeout_secs: 30,
    }
}

/// Numeric suffix after the last `-`
fn suffix(id: &str) -> i64 {
    id.rsplit('-').next().unwrap().parse().unwrap()
}

#[tokio::test]
async fn student_ids_start_at_one_and_increment() {
    let ids = in_memory_generator().await;
    assert_eq!(ids.generate_student_id(2024).await.unwrap(), "HS2024-001");
    assert_eq!(ids.generate_student_id(2024).await.unwrap(), "HS2024-002");
}

#[tokio::test]
async fn teacher_and_student_counters_are_independent() {
    let ids = in_memory_generator().await;
    assert_eq!(ids.generate_teacher_id(2023).await.unwrap(), "GV2023-001");
    assert_eq!(ids.generate_student_id(2023).await.unwrap(), "HS2023-001");
    assert_eq!(ids.generate_teacher_id(2023).await.unwrap(), "GV2023-002");
}

#[tokio::test]
async fn class_id_takes_year_before_dash() {
    let ids = in_memory_generator().await;
    assert_eq!(ids.generate_class_id("2024-2025").await.unwrap(), "C2024-001");
}

#[tokio::test]
async fn malformed_academic_year_uses_current_year() {
    let ids = in_memory_generator().await;
    let id = ids.generate_class_id("").await.unwrap();
    assert_eq!(id, format!("C{}-001", current_year()));
}

#[tokio::test]
async fn sequence_is_not_truncated_past_999() {
    let ids = in_memory_generator().await;
    let mut last = String::new();
    for _ in 0..1000 {
        last = ids.generate_student_id(2024).await.unwrap();
    }
    assert_eq!(last, "HS2024-1000");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_get_consecutive_distinct_suffixes() {
    let dir = TempDir::new().unwrap();
    let db = SqliteDatabase::connect(&file_config(&dir)).await.unwrap();
    let ids = IdGenerator::new(Arc::new(db));
    let n = 64;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let ids = ids.clone();
            tokio::spawn(async move { ids.generate_student_id(2024).await.unwrap() })
        })
        .collect();

    let generated: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let distinct: HashSet<&String> = generated.iter().collect();
    assert_eq!(distinct.len(), n, "Found duplicate ids");

    let mut suffixes: Vec<i64> = generated.iter().map(|id| suffix(id)).collect();
    suffixes.sort();
    assert_eq!(suffixes, (1..=n as i64).collect::<Vec<i64>>());
}

#[tokio::test]
async fn counters_survive_reconnect() {
    let dir = TempDir::new().unwrap();

    {
        let db = SqliteDatabase::connect(&file_config(&dir)).await.unwrap();
        let ids = IdGenerator::new(Arc::new(db));
        ids.generate_student_id(2024).await.unwrap();
        ids.generate_student_id(2024).await.unwrap();
    }

    let db = Arc::new(SqliteDatabase::connect(&file_config(&dir)).await.unwrap());
    assert_eq!(db.current("HS_2024").await.unwrap(), Some(2));

    let ids = IdGenerator::new(db);
    assert_eq!(ids.generate_student_id(2024).await.unwrap(), "HS2024-003");
}
