use serde::{Deserialize, Serialize};

use super::{apply_optional, clean_optional};
use crate::validation::{Validate, ValidationErrors, MAX_NAME_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Teacher {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub subject: Option<String>,
    pub join_year: i32,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTeacherRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    /// Defaults to the current year
    #[serde(default)]
    pub join_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeacherRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl Validate for CreateTeacherRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_name("full_name", &self.full_name);
        errors.check_email("email", &self.email);
        if let Some(subject) = clean_optional(&self.subject) {
            errors.check_max_len("subject", &subject, MAX_NAME_LEN);
        }
        if let Some(year) = self.join_year {
            errors.check_year("join_year", year);
        }
        errors
    }
}

impl CreateTeacherRequest {
    pub fn into_teacher(self, id: String, join_year: i32, created_at: i64) -> Teacher {
        Teacher {
            id,
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: clean_optional(&self.subject),
            join_year,
            created_at,
        }
    }
}

impl Validate for UpdateTeacherRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.full_name {
            errors.require_name("full_name", name);
        }
        if let Some(email) = &self.email {
            errors.check_email("email", email);
        }
        if let Some(subject) = clean_optional(&self.subject) {
            errors.check_max_len("subject", &subject, MAX_NAME_LEN);
        }
        errors
    }
}

impl UpdateTeacherRequest {
    pub fn apply(&self, teacher: &mut Teacher) {
        if let Some(name) = &self.full_name {
            teacher.full_name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            teacher.email = email.trim().to_string();
        }
        apply_optional(&mut teacher.subject, &self.subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_required() {
        let req = CreateTeacherRequest {
            full_name: "Pham Minh D".into(),
            ..Default::default()
        };
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("email"));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut teacher = CreateTeacherRequest {
            full_name: "Pham Minh D".into(),
            email: "d.pham@school.edu".into(),
            subject: Some("Math".into()),
            join_year: Some(2020),
        }
        .into_teacher("GV2020-001".into(), 2020, 0);

        let patch = UpdateTeacherRequest {
            subject: Some("Physics".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_empty());
        patch.apply(&mut teacher);

        assert_eq!(teacher.subject.as_deref(), Some("Physics"));
        assert_eq!(teacher.email, "d.pham@school.edu");
        assert_eq!(teacher.join_year, 2020);
    }
}
