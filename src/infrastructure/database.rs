// Database Interface - record persistence for students, teachers and classes
// Both backends also implement SequenceStore so ids and records share one database.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::error::{AppError, AppResult};
use crate::infrastructure::sequence_store::{MemorySequenceStore, SequenceRecord, SequenceStore};
use crate::infrastructure::sqlite_database::SqliteDatabase;
use crate::models::{SchoolClass, Student, Teacher};

pub(crate) const STUDENT_COLUMNS: &str =
    "id, full_name, email, date_of_birth, enrollment_year, class_id, created_at";
pub(crate) const TEACHER_COLUMNS: &str = "id, full_name, email, subject, join_year, created_at";
pub(crate) const CLASS_COLUMNS: &str =
    "id, name, academic_year, grade_level, homeroom_teacher_id, created_at";

/// Schema shared by the SQLite and PostgreSQL backends
///
/// Tables are created in reference order: teachers, classes, students.
pub(crate) const SCHEMA_STATEMENTS: [(&str, &str); 7] = [
    (
        "id_sequences",
        r#"
        CREATE TABLE IF NOT EXISTS id_sequences (
            key TEXT PRIMARY KEY,
            value BIGINT NOT NULL
        )
        "#,
    ),
    (
        "teachers",
        r#"
        CREATE TABLE IF NOT EXISTS teachers (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT,
            join_year INTEGER NOT NULL,
            created_at BIGINT NOT NULL
        )
        "#,
    ),
    (
        "classes",
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            grade_level INTEGER,
            homeroom_teacher_id TEXT REFERENCES teachers(id),
            created_at BIGINT NOT NULL
        )
        "#,
    ),
    (
        "students",
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT,
            date_of_birth TEXT,
            enrollment_year INTEGER NOT NULL,
            class_id TEXT REFERENCES classes(id),
            created_at BIGINT NOT NULL
        )
        "#,
    ),
    (
        "students class index",
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
    ),
    (
        "classes year index",
        "CREATE INDEX IF NOT EXISTS idx_classes_year ON classes(academic_year)",
    ),
    (
        "classes teacher index",
        "CREATE INDEX IF NOT EXISTS idx_classes_teacher ON classes(homeroom_teacher_id)",
    ),
];

/// Record storage used by the school service
#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    async fn health_check(&self) -> AppResult<()>;

    // Students
    async fn insert_student(&self, student: &Student) -> AppResult<()>;
    async fn get_student(&self, id: &str) -> AppResult<Option<Student>>;
    async fn list_students(&self, class_id: Option<&str>) -> AppResult<Vec<Student>>;
    async fn update_student(&self, student: &Student) -> AppResult<bool>;
    async fn delete_student(&self, id: &str) -> AppResult<bool>;
    async fn count_students_in_class(&self, class_id: &str) -> AppResult<i64>;

    // Teachers
    async fn insert_teacher(&self, teacher: &Teacher) -> AppResult<()>;
    async fn get_teacher(&self, id: &str) -> AppResult<Option<Teacher>>;
    async fn list_teachers(&self) -> AppResult<Vec<Teacher>>;
    async fn update_teacher(&self, teacher: &Teacher) -> AppResult<bool>;
    async fn delete_teacher(&self, id: &str) -> AppResult<bool>;

    // Classes
    async fn insert_class(&self, class: &SchoolClass) -> AppResult<()>;
    async fn get_class(&self, id: &str) -> AppResult<Option<SchoolClass>>;
    async fn list_classes(&self, academic_year: Option<&str>) -> AppResult<Vec<SchoolClass>>;
    async fn update_class(&self, class: &SchoolClass) -> AppResult<bool>;
    async fn delete_class(&self, id: &str) -> AppResult<bool>;
    async fn count_classes_for_teacher(&self, teacher_id: &str) -> AppResult<i64>;
}

/// Handles to the record store and the sequence store
#[derive(Clone)]
pub struct Database {
    pub records: Arc<dyn DatabaseInterface>,
    pub sequences: Arc<dyn SequenceStore>,
}

impl Database {
    pub fn new(records: Arc<dyn DatabaseInterface>, sequences: Arc<dyn SequenceStore>) -> Self {
        Self { records, sequences }
    }

    /// Use one backend for both records and sequences
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: DatabaseInterface + SequenceStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            records: backend.clone(),
            sequences: backend,
        }
    }
}

/// Connect to the configured backend and make sure the schema exists
pub async fn connect_database(config: &DatabaseConfig) -> AppResult<Database> {
    let database = match config.backend {
        DatabaseBackend::Sqlite => Database::from_backend(SqliteDatabase::connect(config).await?),
        DatabaseBackend::Postgres => {
            Database::from_backend(PostgresDatabase::connect(config).await?)
        }
        DatabaseBackend::Memory => Database::new(
            Arc::new(SqliteDatabase::new_in_memory().await?),
            Arc::new(MemorySequenceStore::new()),
        ),
    };
    info!("Database ready ({:?} backend)", config.backend);
    Ok(database)
}

/// Constraint failures on a write become `Conflict`, everything else a database error
///
/// A unique violation means the id is taken. A foreign key violation means the
/// row points at a record that no longer exists, or is still referenced by one.
pub(crate) fn write_error(action: &str, table: &str, id: &str, err: sqlx::Error) -> AppError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("{} record {} already exists", table, id))
        }
        Some(db_err) if db_err.is_foreign_key_violation() => AppError::Conflict(format!(
            "Cannot {} {} record {}: a referenced record is missing or still in use",
            action, table, id
        )),
        _ => AppError::DatabaseError(format!(
            "Failed to {} {} record {}: {}",
            action, table, id, err
        )),
    }
}

pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let database = Self::new(pool);
        database.initialize().await?;
        info!(
            "PostgreSQL pool ready (max {} connections)",
            config.max_connections
        );
        Ok(database)
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

#[async_trait]
impl SequenceStore for PostgresDatabase {
    async fn increment(&self, key: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO id_sequences (key, value) VALUES ($1, 1)
             ON CONFLICT (key) DO UPDATE SET value = id_sequences.value + 1
             RETURNING value",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to increment sequence {}: {}", key, e)))
    }

    async fn current(&self, key: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT value FROM id_sequences WHERE key = $1")
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
impl DatabaseInterface for PostgresDatabase {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    async fn insert_student(&self, student: &Student) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO students ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
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
            "SELECT {} FROM students WHERE id = $1",
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
                    "SELECT {} FROM students WHERE class_id = $1 ORDER BY id",
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
            "UPDATE students SET full_name = $1, email = $2, date_of_birth = $3, class_id = $4
             WHERE id = $5",
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
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "student", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_students_in_class(&self, class_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE class_id = $1")
            .bind(class_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count students in {}: {}", class_id, e))
            })
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO teachers ({}) VALUES ($1, $2, $3, $4, $5, $6)",
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
            "SELECT {} FROM teachers WHERE id = $1",
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
            "UPDATE teachers SET full_name = $1, email = $2, subject = $3 WHERE id = $4",
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
        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "teacher", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_class(&self, class: &SchoolClass) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO classes ({}) VALUES ($1, $2, $3, $4, $5, $6)",
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
            "SELECT {} FROM classes WHERE id = $1",
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
                    "SELECT {} FROM classes WHERE academic_year = $1 ORDER BY id",
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
            "UPDATE classes SET name = $1, grade_level = $2, homeroom_teacher_id = $3 WHERE id = $4",
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
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete", "class", id, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_classes_for_teacher(&self, teacher_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE homeroom_teacher_id = $1")
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
