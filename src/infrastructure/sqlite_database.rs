use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{
    write_error, DatabaseInterface, CLASS_COLUMNS, SCHEMA_STATEMENTS, STUDENT_COLUMNS,
    TEACHER_COLUMNS,
};
use crate::infrastructure::sequence_store::{SequenceRecord, SequenceStore};
use crate::models::{SchoolClass, Student, Teacher};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of the record and sequence stores
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Single-connection in-memory database; the data lives as long as the pool
    pub async fn new_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::ConfigurationError(format!("Invalid SQLite URL: {}", e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        if config.url.contains(":memory:") {
            return Self::new_in_memory().await;
        }

        if let Some(parent) = database_file_parent(&config.url) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        info!(
            "SQLite pool ready at {} (max {} connections)",
            config.url, config.max_connections
        );
        Ok(db)
    }

    /// Create tables if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        for (name, sql) in SCHEMA_STATEMENTS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create {}: {}", name, e)))?;
        }
        Ok(())
    }
}

/// Directory holding the database file of a `sqlite:` URL, if it has one
fn database_file_parent(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
}

#[async_trait]
impl SequenceStore for SqliteDatabase {
    async fn increment(&self, key: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO id_sequences (key, value) VALUES (?, 1)
             ON CONFLICT(key) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to increment sequence {}: {}", key, e)))
    }

    async fn current(&self, key: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT value FROM id_sequences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read sequence {}: {}", key, e)))
    }

    async fn records(&self) -> AppResult<Vec<SequenceRecord>> {
        sqlx::query_as::<_, SequenceRecord>("SELECT key, value FROM id_sequences ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list sequences: {}", e)))
    }
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    async fn insert_student(&self, student: &Student) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO students ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            STUDENT_COLUMNS
        ))
        .bind(&student.id)
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.date_of_birth)
        .bind(student.enrollment_year)
        .bind(&student.class_id)
        .bind(student.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert", "student", &student.id, e))?;
        Ok(())
    }

    async fn get_student(&self, id: &str) -> AppResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = ?",
            STUDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get student {}: {}", id, e)))
    }

    async fn list_students(&self, class_id: Option<&str>) -> AppResult<Vec<Student>> {
        let rows = match class_id {
            Some(class_id) => {
                let sql = format!(
                    "SELECT {} FROM students WHERE class_id = ? ORDER BY id",
                    STUDENT_COLUMNS
                );
                sqlx::query_as::<_, Student>(&sql)
                    .bind(class_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM students ORDER BY id", STUDENT_COLUMNS);
                sqlx::query_as::<_, Student>(&sql).fetch_all(&self.pool).await
            }
        };
        rows.map_err(|e| AppError::DatabaseError(format!("Failed to list students: {}", e)))
    }

    async fn update_student(&self, student: &Student) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE students SET full_name = ?, email = ?, date_of_birth = ?, class_id = ?
             WHERE id = ?",
        )
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.date_of_birth)
        .bind(&student.class_id)
        .bind(&student.id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update", "student", &student.id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_student(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "student", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_students_in_class(&self, class_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE class_id = ?")
            .bind(class_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count students in {}: {}", class_id, e))
            })
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO teachers ({}) VALUES (?, ?, ?, ?, ?, ?)",
            TEACHER_COLUMNS
        ))
        .bind(&teacher.id)
        .bind(&teacher.full_name)
        .bind(&teacher.email)
        .bind(&teacher.subject)
        .bind(teacher.join_year)
        .bind(teacher.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert", "teacher", &teacher.id, e))?;
        Ok(())
    }

    async fn get_teacher(&self, id: &str) -> AppResult<Option<Teacher>> {
        sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {} FROM teachers WHERE id = ?",
            TEACHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get teacher {}: {}", id, e)))
    }

    async fn list_teachers(&self) -> AppResult<Vec<Teacher>> {
        sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {} FROM teachers ORDER BY id",
            TEACHER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list teachers: {}", e)))
    }

    async fn update_teacher(&self, teacher: &Teacher) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE teachers SET full_name = ?, email = ?, subject = ? WHERE id = ?",
        )
        .bind(&teacher.full_name)
        .bind(&teacher.email)
        .bind(&teacher.subject)
        .bind(&teacher.id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update", "teacher", &teacher.id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_teacher(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "teacher", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_class(&self, class: &SchoolClass) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO classes ({}) VALUES (?, ?, ?, ?, ?, ?)",
            CLASS_COLUMNS
        ))
        .bind(&class.id)
        .bind(&class.name)
        .bind(&class.academic_year)
        .bind(class.grade_level)
        .bind(&class.homeroom_teacher_id)
        .bind(class.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert", "class", &class.id, e))?;
        Ok(())
    }

    async fn get_class(&self, id: &str) -> AppResult<Option<SchoolClass>> {
        sqlx::query_as::<_, SchoolClass>(&format!(
            "SELECT {} FROM classes WHERE id = ?",
            CLASS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get class {}: {}", id, e)))
    }

    async fn list_classes(&self, academic_year: Option<&str>) -> AppResult<Vec<SchoolClass>> {
        let rows = match academic_year {
            Some(year) => {
                let sql = format!(
                    "SELECT {} FROM classes WHERE academic_year = ? ORDER BY id",
                    CLASS_COLUMNS
                );
                sqlx::query_as::<_, SchoolClass>(&sql)
                    .bind(year)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM classes ORDER BY id", CLASS_COLUMNS);
                sqlx::query_as::<_, SchoolClass>(&sql).fetch_all(&self.pool).await
            }
        };
        rows.map_err(|e| AppError::DatabaseError(format!("Failed to list classes: {}", e)))
    }

    async fn update_class(&self, class: &SchoolClass) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE classes SET name = ?, grade_level = ?, homeroom_teacher_id = ? WHERE id = ?",
        )
        .bind(&class.name)
        .bind(class.grade_level)
        .bind(&class.homeroom_teacher_id)
        .bind(&class.id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update", "class", &class.id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_class(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "class", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_classes_for_teacher(&self, teacher_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE homeroom_teacher_id = ?")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to count classes for teacher {}: {}",
                    teacher_id, e
                ))
            })
    }
}
