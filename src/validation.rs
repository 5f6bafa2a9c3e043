// Request validation - explicit field checks collected into a single error list

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::{AppError, AppResult};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ACADEMIC_YEAR_LEN: usize = 20;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

static ACADEMIC_YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}$").expect("academic year pattern is a valid regex"));

/// A single failing field and the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field error found during one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

/// Implemented by request bodies; runs every check and reports all failures together
pub trait Validate {
    fn validate(&self) -> ValidationErrors;
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Ok when nothing failed, otherwise `AppError::Validation`
    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    pub fn require_name(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "must not be empty");
        } else if trimmed.chars().count() > MAX_NAME_LEN {
            self.add(field, format!("must be at most {} characters", MAX_NAME_LEN));
        }
    }

    pub fn check_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }

    pub fn check_email(&mut self, field: &str, value: &str) {
        if !EMAIL_PATTERN.is_match(value.trim()) {
            self.add(field, "must be a valid email address");
        }
    }

    pub fn check_year(&mut self, field: &str, year: i32) {
        self.check_range(field, year, MIN_YEAR, MAX_YEAR);
    }

    pub fn check_range(&mut self, field: &str, value: i32, min: i32, max: i32) {
        if value < min || value > max {
            self.add(field, format!("must be between {} and {}", min, max));
        }
    }

    /// Dates are `YYYY-MM-DD` and may not lie after `today`
    pub fn check_date_of_birth(&mut self, field: &str, value: &str, today: NaiveDate) {
        match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(date) if date > today => self.add(field, "must not be in the future"),
            Ok(_) => {}
            Err(_) => self.add(field, "must be a date in YYYY-MM-DD format"),
        }
    }

    pub fn check_academic_year(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "must not be empty");
        } else {
            self.check_max_len(field, trimmed, MAX_ACADEMIC_YEAR_LEN);
        }
    }
}

/// `YYYY-YYYY` with the second year immediately after the first
pub fn is_well_formed_academic_year(value: &str) -> bool {
    if !ACADEMIC_YEAR_PATTERN.is_match(value) {
        return false;
    }
    match value.split_once('-') {
        Some((start, end)) => match (start.parse::<i32>(), end.parse::<i32>()) {
            (Ok(start), Ok(end)) => end == start + 1,
            _ => false,
        },
        None => false,
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
