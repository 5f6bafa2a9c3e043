use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{apply_optional, clean_optional};
use crate::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub enrollment_year: i32,
    pub class_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Defaults to the current year
    #[serde(default)]
    pub enrollment_year: Option<i32>,
    #[serde(default)]
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
}

impl CreateStudentRequest {
    pub fn validate_as_of(&self, today: NaiveDate) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_name("full_name", &self.full_name);
        if let Some(email) = clean_optional(&self.email) {
            errors.check_email("email", &email);
        }
        if let Some(dob) = clean_optional(&self.date_of_birth) {
            errors.check_date_of_birth("date_of_birth", &dob, today);
        }
        if let Some(year) = self.enrollment_year {
            errors.check_year("enrollment_year", year);
        }
        errors
    }

    pub fn into_student(self, id: String, enrollment_year: i32, created_at: i64) -> Student {
        Student {
            id,
            full_name: self.full_name.trim().to_string(),
            email: clean_optional(&self.email),
            date_of_birth: clean_optional(&self.date_of_birth),
            enrollment_year,
            class_id: clean_optional(&self.class_id),
            created_at,
        }
    }
}

impl Validate for CreateStudentRequest {
    fn validate(&self) -> ValidationErrors {
        self.validate_as_of(Utc::now().date_naive())
    }
}

impl UpdateStudentRequest {
    pub fn validate_as_of(&self, today: NaiveDate) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.full_name {
            errors.require_name("full_name", name);
        }
        if let Some(email) = clean_optional(&self.email) {
            errors.check_email("email", &email);
        }
        if let Some(dob) = clean_optional(&self.date_of_birth) {
            errors.check_date_of_birth("date_of_birth", &dob, today);
        }
        errors
    }

    /// Class the student moves into, if the patch names one
    pub fn target_class(&self) -> Option<String> {
        clean_optional(&self.class_id)
    }

    pub fn apply(&self, student: &mut Student) {
        if let Some(name) = &self.full_name {
            student.full_name = name.trim().to_string();
        }
        apply_optional(&mut student.email, &self.email);
        apply_optional(&mut student.date_of_birth, &self.date_of_birth);
        apply_optional(&mut student.class_id, &self.class_id);
    }
}

impl Validate for UpdateStudentRequest {
    fn validate(&self) -> ValidationErrors {
        self.validate_as_of(Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn test_missing_name_and_bad_email_reported_together() {
        let req = CreateStudentRequest {
            full_name: "".into(),
            email: Some("nope".into()),
            enrollment_year: Some(3000),
            ..Default::default()
        };
        let errors = req.validate_as_of(today());
        assert_eq!(errors.len(), 3);
        assert!(errors.has_field("full_name"));
        assert!(errors.has_field("email"));
        assert!(errors.has_field("enrollment_year"));
    }

    #[test]
    fn test_into_student_trims_and_drops_blanks() {
        let req = CreateStudentRequest {
            full_name: "  Tran Thi Binh ".into(),
            email: Some(" ".into()),
            date_of_birth: Some("2010-02-03".into()),
            enrollment_year: None,
            class_id: Some("".into()),
        };
        assert!(req.validate_as_of(today()).is_empty());

        let student = req.into_student("HS2024-001".into(), 2024, 42);
        assert_eq!(student.full_name, "Tran Thi Binh");
        assert_eq!(student.email, None);
        assert_eq!(student.class_id, None);
        assert_eq!(student.date_of_birth.as_deref(), Some("2010-02-03"));
    }

    #[test]
    fn test_update_clears_class() {
        let mut student = CreateStudentRequest {
            full_name: "Le Van C".into(),
            class_id: Some("C2024-001".into()),
            ..Default::default()
        }
        .into_student("HS2024-002".into(), 2024, 0);

        let patch = UpdateStudentRequest {
            class_id: Some("".into()),
            ..Default::default()
        };
        assert_eq!(patch.target_class(), None);
        patch.apply(&mut student);
        assert_eq!(student.class_id, None);
        assert_eq!(student.full_name, "Le Van C");
    }
}
