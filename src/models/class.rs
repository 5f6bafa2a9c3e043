use serde::{Deserialize, Serialize};

use super::{apply_optional, clean_optional};
use crate::validation::{Validate, ValidationErrors};

pub const MIN_GRADE_LEVEL: i32 = 1;
pub const MAX_GRADE_LEVEL: i32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    pub academic_year: String,
    pub grade_level: Option<i32>,
    pub homeroom_teacher_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateClassRequest {
    #[serde(default)]
    pub name: String,
    /// Expected as `YYYY-YYYY`, e.g. `2024-2025`
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub grade_level: Option<i32>,
    #[serde(default)]
    pub homeroom_teacher_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClassRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Absent and `null` both keep the current grade.
    /// A grade level can be changed but not cleared.
    #[serde(default)]
    pub grade_level: Option<i32>,
    #[serde(default)]
    pub homeroom_teacher_id: Option<String>,
}

impl Validate for CreateClassRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_name("name", &self.name);
        errors.check_academic_year("academic_year", &self.academic_year);
        if let Some(grade) = self.grade_level {
            errors.check_range("grade_level", grade, MIN_GRADE_LEVEL, MAX_GRADE_LEVEL);
        }
        errors
    }
}

impl CreateClassRequest {
    pub fn into_class(self, id: String, created_at: i64) -> SchoolClass {
        SchoolClass {
            id,
            name: self.name.trim().to_string(),
            academic_year: self.academic_year.trim().to_string(),
            grade_level: self.grade_level,
            homeroom_teacher_id: clean_optional(&self.homeroom_teacher_id),
            created_at,
        }
    }
}

impl Validate for UpdateClassRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.require_name("name", name);
        }
        if let Some(grade) = self.grade_level {
            errors.check_range("grade_level", grade, MIN_GRADE_LEVEL, MAX_GRADE_LEVEL);
        }
        errors
    }
}

impl UpdateClassRequest {
    /// Homeroom teacher the patch assigns, if any
    pub fn target_teacher(&self) -> Option<String> {
        clean_optional(&self.homeroom_teacher_id)
    }

    pub fn apply(&self, class: &mut SchoolClass) {
        if let Some(name) = &self.name {
            class.name = name.trim().to_string();
        }
        if let Some(grade) = self.grade_level {
            class.grade_level = Some(grade);
        }
        apply_optional(&mut class.homeroom_teacher_id, &self.homeroom_teacher_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_level_bounds() {
        let req = CreateClassRequest {
            name: "10A1".into(),
            academic_year: "2024-2025".into(),
            grade_level: Some(13),
            homeroom_teacher_id: None,
        };
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("grade_level"));
    }

    #[test]
    fn test_blank_academic_year_rejected() {
        let req = CreateClassRequest {
            name: "10A1".into(),
            academic_year: "  ".into(),
            ..Default::default()
        };
        assert!(req.validate().has_field("academic_year"));
    }

    #[test]
    fn test_patch_keeps_grade_level_unless_given() {
        let mut class = SchoolClass {
            id: "C2024-001".into(),
            name: "10A1".into(),
            academic_year: "2024-2025".into(),
            grade_level: Some(10),
            homeroom_teacher_id: Some("GV2020-001".into()),
            created_at: 0,
        };

        let patch: UpdateClassRequest =
            serde_json::from_str(r#"{"grade_level": null, "homeroom_teacher_id": ""}"#).unwrap();
        patch.apply(&mut class);
        assert_eq!(class.grade_level, Some(10));
        assert_eq!(class.homeroom_teacher_id, None);

        let patch: UpdateClassRequest = serde_json::from_str(r#"{"grade_level": 11}"#).unwrap();
        patch.apply(&mut class);
        assert_eq!(class.grade_level, Some(11));
        assert_eq!(class.name, "10A1");
    }
}
