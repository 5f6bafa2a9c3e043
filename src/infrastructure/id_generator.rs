// School ID Generator - human-readable identifiers backed by persistent per-year counters
// Format: <prefix><year>-<sequence zero-padded to 3 digits>, e.g. HS2024-001

use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::sequence_store::{sequence_key, SequenceStore};
use crate::validation::{is_well_formed_academic_year, ValidationErrors};

pub const STUDENT_PREFIX: &str = "HS";
pub const TEACHER_PREFIX: &str = "GV";
pub const CLASS_PREFIX: &str = "C";

/// Minimum digits in the sequence part; larger values simply grow wider
pub const SEQUENCE_WIDTH: usize = 3;

/// Allocates identifiers for students, teachers and classes.
///
/// Every call performs exactly one atomic increment on the sequence store, so any
/// number of generator instances (and processes) can share one store. No locking
/// or caching happens here.
#[derive(Clone)]
pub struct IdGenerator {
    store: Arc<dyn SequenceStore>,
    strict_academic_year: bool,
}

impl IdGenerator {
    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self {
            store,
            strict_academic_year: false,
        }
    }

    /// Reject malformed academic years instead of falling back to the current year
    pub fn with_strict_academic_year(mut self, strict: bool) -> Self {
        self.strict_academic_year = strict;
        self
    }

    pub fn store(&self) -> &Arc<dyn SequenceStore> {
        &self.store
    }

    /// Allocate the next id for `prefix` within `year`
    pub async fn generate_id(&self, prefix: &str, year: i32) -> AppResult<String> {
        let key = sequence_key(prefix, year);
        let value = self.store.increment(&key).await?;
        if value < 1 {
            return Err(AppError::IdGenerationError(format!(
                "Sequence {} returned non-positive value {}",
                key, value
            )));
        }

        let id = format_id(prefix, year, value);
        debug!("Allocated id {} from sequence {}", id, key);
        Ok(id)
    }

    pub async fn generate_student_id(&self, enrollment_year: i32) -> AppResult<String> {
        self.generate_id(STUDENT_PREFIX, enrollment_year).await
    }

    pub async fn generate_teacher_id(&self, join_year: i32) -> AppResult<String> {
        self.generate_id(TEACHER_PREFIX, join_year).await
    }

    /// Class ids take their year from the start of an academic year such as `2024-2025`
    pub async fn generate_class_id(&self, academic_year: &str) -> AppResult<String> {
        let year = self.class_year(academic_year)?;
        self.generate_id(CLASS_PREFIX, year).await
    }

    /// Year component used for a class id.
    ///
    /// Permissive mode takes the text before the first `-` and falls back to the
    /// current year when it is missing or not a number. Strict mode requires `YYYY-YYYY`.
    pub fn class_year(&self, academic_year: &str) -> AppResult<i32> {
        if self.strict_academic_year && !is_well_formed_academic_year(academic_year.trim()) {
            let mut errors = ValidationErrors::new();
            errors.add("academic_year", "must be in YYYY-YYYY format");
            return Err(AppError::Validation(errors));
        }

        match parse_year_component(academic_year) {
            Some(year) => Ok(year),
            None => {
                let fallback = current_year();
                warn!(
                    "Malformed academic year {:?}, using current year {} for class id",
                    academic_year, fallback
                );
                Ok(fallback)
            }
        }
    }
}

/// `HS` + 2024 + 7 -> `HS2024-007`
pub fn format_id(prefix: &str, year: i32, value: i64) -> String {
    format!("{}{}-{:0width$}", prefix, year, value, width = SEQUENCE_WIDTH)
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

fn parse_year_component(academic_year: &str) -> Option<i32> {
    let head = academic_year.trim().split('-').next()?.trim();
    if head.is_empty() {
        return None;
    }
    head.parse::<i32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sequence_store::MemorySequenceStore;

    fn generator() -> IdGenerator {
        IdGenerator::new(Arc::new(MemorySequenceStore::new()))
    }

    #[test]
    fn test_format_id() {
        assert_eq!(format_id("HS", 2024, 1), "HS2024-001");
        assert_eq!(format_id("GV", 2023, 42), "GV2023-042");
        assert_eq!(format_id("C", 2024, 999), "C2024-999");
        assert_eq!(format_id("HS", 2024, 1000), "HS2024-1000");
    }

    #[test]
    fn test_parse_year_component() {
        assert_eq!(parse_year_component("2024-2025"), Some(2024));
        assert_eq!(parse_year_component(" 2024 - 2025 "), Some(2024));
        assert_eq!(parse_year_component("2024"), Some(2024));
        assert_eq!(parse_year_component(""), None);
        assert_eq!(parse_year_component("-2025"), None);
        assert_eq!(parse_year_component("next-year"), None);
    }

    #[tokio::test]
    async fn test_student_ids_increment() {
        let ids = generator();
        assert_eq!(ids.generate_student_id(2024).await.unwrap(), "HS2024-001");
        assert_eq!(ids.generate_student_id(2024).await.unwrap(), "HS2024-002");
        assert_eq!(ids.generate_student_id(2025).await.unwrap(), "HS2025-001");
    }

    #[tokio::test]
    async fn test_prefixes_have_independent_counters() {
        let ids = generator();
        assert_eq!(ids.generate_teacher_id(2023).await.unwrap(), "GV2023-001");
        assert_eq!(ids.generate_student_id(2023).await.unwrap(), "HS2023-001");
    }

    #[tokio::test]
    async fn test_class_id_uses_first_year() {
        let ids = generator();
        assert_eq!(ids.generate_class_id("2024-2025").await.unwrap(), "C2024-001");
        assert_eq!(ids.generate_class_id("2024-2025").await.unwrap(), "C2024-002");
    }

    #[tokio::test]
    async fn test_class_id_falls_back_to_current_year() {
        let ids = generator();
        let id = ids.generate_class_id("").await.unwrap();
        assert_eq!(id, format!("C{}-001", current_year()));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_malformed_academic_year() {
        let store = Arc::new(MemorySequenceStore::new());
        let ids = IdGenerator::new(store.clone()).with_strict_academic_year(true);

        match ids.generate_class_id("2024").await {
            Err(AppError::Validation(errors)) => assert!(errors.has_field("academic_year")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(store.records().await.unwrap().is_empty());

        assert_eq!(ids.generate_class_id("2024-2025").await.unwrap(), "C2024-001");
    }
}
