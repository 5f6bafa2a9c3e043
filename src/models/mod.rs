// School records and the request bodies that create or modify them

pub mod class;
pub mod student;
pub mod teacher;

pub use class::{CreateClassRequest, SchoolClass, UpdateClassRequest};
pub use student::{CreateStudentRequest, Student, UpdateStudentRequest};
pub use teacher::{CreateTeacherRequest, Teacher, UpdateTeacherRequest};

/// Trimmed value, or None for missing and blank input
pub(crate) fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Patch semantics for optional text fields:
/// absent leaves the field alone, a blank string clears it, anything else replaces it.
pub(crate) fn apply_optional(target: &mut Option<String>, patch: &Option<String>) {
    if patch.is_some() {
        *target = clean_optional(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_optional() {
        let mut field = Some("old".to_string());
        apply_optional(&mut field, &None);
        assert_eq!(field.as_deref(), Some("old"));

        apply_optional(&mut field, &Some("  new ".to_string()));
        assert_eq!(field.as_deref(), Some("new"));

        apply_optional(&mut field, &Some("   ".to_string()));
        assert_eq!(field, None);
    }
}
