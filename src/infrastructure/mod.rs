// Core infrastructure modules
pub mod database;        // Record store interface, PostgreSQL backend, connection setup
pub mod id_generator;    // Human-readable id allocation
pub mod sequence_store;  // Atomic keyed counters
pub mod sqlite_database; // SQLite backend

// Re-export core infrastructure components
pub use database::{connect_database, Database, DatabaseInterface, PostgresDatabase};
pub use id_generator::{IdGenerator, CLASS_PREFIX, STUDENT_PREFIX, TEACHER_PREFIX};
pub use sequence_store::{sequence_key, MemorySequenceStore, SequenceRecord, SequenceStore};
pub use sqlite_database::SqliteDatabase;
