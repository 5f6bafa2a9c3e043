// SchoolService - enrollment, hiring and class workflows on top of the record store
// Validation runs before any id is allocated, so rejected requests never consume a sequence number.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::{
    config::IdConfig,
    error::{AppError, AppResult},
    infrastructure::{
        database::{Database, DatabaseInterface},
        id_generator::{current_year, IdGenerator},
        sequence_store::SequenceRecord,
    },
    models::{
        clean_optional, CreateClassRequest, CreateStudentRequest, CreateTeacherRequest,
        SchoolClass, Student, Teacher, UpdateClassRequest, UpdateStudentRequest,
        UpdateTeacherRequest,
    },
    validation::{Validate, ValidationErrors},
};

#[derive(Clone)]
pub struct SchoolService {
    records: Arc<dyn DatabaseInterface>,
    ids: IdGenerator,
}

impl SchoolService {
    pub fn new(database: Database, id_config: &IdConfig) -> Self {
        let ids = IdGenerator::new(database.sequences)
            .with_strict_academic_year(id_config.strict_academic_year);
        Self {
            records: database.records,
            ids,
        }
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.records.health_check().await
    }

    // Students

    pub async fn enroll_student(&self, req: CreateStudentRequest) -> AppResult<Student> {
        let mut errors = req.validate();
        if let Some(class_id) = clean_optional(&req.class_id) {
            self.require_class(&mut errors, &class_id).await?;
        }
        errors.into_result()?;

        let year = req.enrollment_year.unwrap_or_else(current_year);
        let id = self.ids.generate_student_id(year).await?;
        let student = req.into_student(id, year, now_millis());
        self.records.insert_student(&student).await?;

        info!("Enrolled student {}", student.id);
        Ok(student)
    }

    pub async fn get_student(&self, id: &str) -> AppResult<Student> {
        self.records
            .get_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))
    }

    pub async fn list_students(&self, class_id: Option<&str>) -> AppResult<Vec<Student>> {
        self.records.list_students(class_id).await
    }

    pub async fn update_student(&self, id: &str, patch: UpdateStudentRequest) -> AppResult<Student> {
        let mut errors = patch.validate();
        if let Some(class_id) = patch.target_class() {
            self.require_class(&mut errors, &class_id).await?;
        }
        errors.into_result()?;

        let mut student = self.get_student(id).await?;
        patch.apply(&mut student);
        if !self.records.update_student(&student).await? {
            return Err(AppError::NotFound(format!("Student {} not found", id)));
        }
        Ok(student)
    }

    pub async fn delete_student(&self, id: &str) -> AppResult<()> {
        if !self.records.delete_student(id).await? {
            return Err(AppError::NotFound(format!("Student {} not found", id)));
        }
        info!("Removed student {}", id);
        Ok(())
    }

    // Teachers

    pub async fn hire_teacher(&self, req: CreateTeacherRequest) -> AppResult<Teacher> {
        req.validate().into_result()?;

        let year = req.join_year.unwrap_or_else(current_year);
        let id = self.ids.generate_teacher_id(year).await?;
        let teacher = req.into_teacher(id, year, now_millis());
        self.records.insert_teacher(&teacher).await?;

        info!("Hired teacher {}", teacher.id);
        Ok(teacher)
    }

    pub async fn get_teacher(&self, id: &str) -> AppResult<Teacher> {
        self.records
            .get_teacher(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Teacher {} not found", id)))
    }

    pub async fn list_teachers(&self) -> AppResult<Vec<Teacher>> {
        self.records.list_teachers().await
    }

    pub async fn update_teacher(&self, id: &str, patch: UpdateTeacherRequest) -> AppResult<Teacher> {
        patch.validate().into_result()?;

        let mut teacher = self.get_teacher(id).await?;
        patch.apply(&mut teacher);
        if !self.records.update_teacher(&teacher).await? {
            return Err(AppError::NotFound(format!("Teacher {} not found", id)));
        }
        Ok(teacher)
    }

    /// Teachers still assigned as homeroom teacher cannot be removed
    pub async fn delete_teacher(&self, id: &str) -> AppResult<()> {
        let classes = self.records.count_classes_for_teacher(id).await?;
        if classes > 0 {
            return Err(AppError::Conflict(format!(
                "Teacher {} is homeroom teacher of {} class(es)",
                id, classes
            )));
        }
        if !self.records.delete_teacher(id).await? {
            return Err(AppError::NotFound(format!("Teacher {} not found", id)));
        }
        info!("Removed teacher {}", id);
        Ok(())
    }

    // Classes

    pub async fn create_class(&self, req: CreateClassRequest) -> AppResult<SchoolClass> {
        let mut errors = req.validate();
        if let Some(teacher_id) = clean_optional(&req.homeroom_teacher_id) {
            self.require_teacher(&mut errors, &teacher_id).await?;
        }
        errors.into_result()?;

        let id = self.ids.generate_class_id(&req.academic_year).await?;
        let class = req.into_class(id, now_millis());
        self.records.insert_class(&class).await?;

        info!("Created class {} ({})", class.id, class.name);
        Ok(class)
    }

    pub async fn get_class(&self, id: &str) -> AppResult<SchoolClass> {
        self.records
            .get_class(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", id)))
    }

    pub async fn list_classes(&self, academic_year: Option<&str>) -> AppResult<Vec<SchoolClass>> {
        self.records.list_classes(academic_year).await
    }

    pub async fn update_class(&self, id: &str, patch: UpdateClassRequest) -> AppResult<SchoolClass> {
        let mut errors = patch.validate();
        if let Some(teacher_id) = patch.target_teacher() {
            self.require_teacher(&mut errors, &teacher_id).await?;
        }
        errors.into_result()?;

        let mut class = self.get_class(id).await?;
        patch.apply(&mut class);
        if !self.records.update_class(&class).await? {
            return Err(AppError::NotFound(format!("Class {} not found", id)));
        }
        Ok(class)
    }

    /// Classes with enrolled students cannot be removed
    pub async fn delete_class(&self, id: &str) -> AppResult<()> {
        let students = self.records.count_students_in_class(id).await?;
        if students > 0 {
            return Err(AppError::Conflict(format!(
                "Class {} still has {} enrolled student(s)",
                id, students
            )));
        }
        if !self.records.delete_class(id).await? {
            return Err(AppError::NotFound(format!("Class {} not found", id)));
        }
        info!("Removed class {}", id);
        Ok(())
    }

    pub async fn class_roster(&self, id: &str) -> AppResult<Vec<Student>> {
        self.get_class(id).await?;
        self.records.list_students(Some(id)).await
    }

    // Sequences

    pub async fn sequence_value(&self, key: &str) -> AppResult<SequenceRecord> {
        match self.ids.store().current(key).await? {
            Some(value) => Ok(SequenceRecord {
                key: key.to_string(),
                value,
            }),
            None => Err(AppError::NotFound(format!("Sequence {} not found", key))),
        }
    }

    pub async fn sequences(&self) -> AppResult<Vec<SequenceRecord>> {
        self.ids.store().records().await
    }

    async fn require_class(&self, errors: &mut ValidationErrors, class_id: &str) -> AppResult<()> {
        if self.records.get_class(class_id).await?.is_none() {
            errors.add("class_id", format!("class {} does not exist", class_id));
        }
        Ok(())
    }

    async fn require_teacher(
        &self,
        errors: &mut ValidationErrors,
        teacher_id: &str,
    ) -> AppResult<()> {
        if self.records.get_teacher(teacher_id).await?.is_none() {
            errors.add(
                "homeroom_teacher_id",
                format!("teacher {} does not exist", teacher_id),
            );
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        sequence_store::MemorySequenceStore, sqlite_database::SqliteDatabase,
    };

    async fn service() -> SchoolService {
        let database = Database::new(
            Arc::new(SqliteDatabase::new_in_memory().await.unwrap()),
            Arc::new(MemorySequenceStore::new()),
        );
        SchoolService::new(
            database,
            &IdConfig {
                strict_academic_year: false,
            },
        )
    }

    #[tokio::test]
    async fn test_enroll_assigns_sequential_ids() {
        let service = service().await;
        let first = service
            .enroll_student(CreateStudentRequest {
                full_name: "Nguyen Van An".into(),
                enrollment_year: Some(2024),
                ..Default::default()
            })
            .await
            .unwrap();
        let second = service
            .enroll_student(CreateStudentRequest {
                full_name: "Tran Thi Binh".into(),
                enrollment_year: Some(2024),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.id, "HS2024-001");
        assert_eq!(second.id, "HS2024-002");
        assert_eq!(service.get_student("HS2024-002").await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_rejected_request_does_not_consume_sequence() {
        let service = service().await;
        let err = service
            .enroll_student(CreateStudentRequest {
                full_name: "Nguyen Van An".into(),
                enrollment_year: Some(2024),
                class_id: Some("C2024-404".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.has_field("class_id")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(service.sequences().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_class_with_students_conflicts() {
        let service = service().await;
        let class = service
            .create_class(CreateClassRequest {
                name: "10A1".into(),
                academic_year: "2024-2025".into(),
                grade_level: Some(10),
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();
        assert_eq!(class.id, "C2024-001");

        service
            .enroll_student(CreateStudentRequest {
                full_name: "Le Van C".into(),
                enrollment_year: Some(2024),
                class_id: Some(class.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            service.delete_class(&class.id).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(service.class_roster(&class.id).await.unwrap().len(), 1);
    }
}
