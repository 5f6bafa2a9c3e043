// School HTTP interface - REST endpoints for students, teachers, classes and id sequences
// Every response uses the ApiResponse envelope; errors are rendered by AppError,
// including malformed bodies and query strings.

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiQuery},
    infrastructure::sequence_store::SequenceRecord,
    models::{
        CreateClassRequest, CreateStudentRequest, CreateTeacherRequest, SchoolClass, Student,
        Teacher, UpdateClassRequest, UpdateStudentRequest, UpdateTeacherRequest,
    },
};

// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;
type CreatedResult<T> = AppResult<(StatusCode, Json<ApiResponse<T>>)>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn created<T>(data: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, Deserialize)]
pub struct StudentFilter {
    pub class_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassFilter {
    pub academic_year: Option<String>,
}

// HTTP Handlers

pub async fn health_handler(State(state): State<AppState>) -> ApiResult<Value> {
    state.school.health_check().await?;
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_student_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateStudentRequest>,
) -> CreatedResult<Student> {
    created(state.school.enroll_student(req).await?)
}

pub async fn list_students_handler(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StudentFilter>,
) -> ApiResult<Vec<Student>> {
    ok(state.school.list_students(filter.class_id.as_deref()).await?)
}

pub async fn get_student_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Student> {
    ok(state.school.get_student(&id).await?)
}

pub async fn update_student_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    ApiJson(patch): ApiJson<UpdateStudentRequest>,
) -> ApiResult<Student> {
    ok(state.school.update_student(&id, patch).await?)
}

pub async fn delete_student_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Value> {
    state.school.delete_student(&id).await?;
    ok(json!({ "id": id, "deleted": true }))
}

pub async fn create_teacher_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTeacherRequest>,
) -> CreatedResult<Teacher> {
    created(state.school.hire_teacher(req).await?)
}

pub async fn list_teachers_handler(State(state): State<AppState>) -> ApiResult<Vec<Teacher>> {
    ok(state.school.list_teachers().await?)
}

pub async fn get_teacher_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Teacher> {
    ok(state.school.get_teacher(&id).await?)
}

pub async fn update_teacher_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    ApiJson(patch): ApiJson<UpdateTeacherRequest>,
) -> ApiResult<Teacher> {
    ok(state.school.update_teacher(&id, patch).await?)
}

pub async fn delete_teacher_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Value> {
    state.school.delete_teacher(&id).await?;
    ok(json!({ "id": id, "deleted": true }))
}

pub async fn create_class_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateClassRequest>,
) -> CreatedResult<SchoolClass> {
    created(state.school.create_class(req).await?)
}

pub async fn list_classes_handler(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ClassFilter>,
) -> ApiResult<Vec<SchoolClass>> {
    ok(state.school.list_classes(filter.academic_year.as_deref()).await?)
}

pub async fn get_class_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<SchoolClass> {
    ok(state.school.get_class(&id).await?)
}

pub async fn update_class_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    ApiJson(patch): ApiJson<UpdateClassRequest>,
) -> ApiResult<SchoolClass> {
    ok(state.school.update_class(&id, patch).await?)
}

pub async fn delete_class_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Value> {
    state.school.delete_class(&id).await?;
    ok(json!({ "id": id, "deleted": true }))
}

pub async fn class_roster_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Vec<Student>> {
    ok(state.school.class_roster(&id).await?)
}

pub async fn list_sequences_handler(
    State(state): State<AppState>,
) -> ApiResult<Vec<SequenceRecord>> {
    ok(state.school.sequences().await?)
}

pub async fn get_sequence_handler(
    State(state): State<AppState>,
    AxumPath(key): AxumPath<String>,
) -> ApiResult<SequenceRecord> {
    ok(state.school.sequence_value(&key).await?)
}

/// A panicking handler answers with the standard 500 envelope instead of dropping the connection
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}

// Create school router (relative paths, nested under /api/v1 by create_app)
pub fn create_school_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Students
        .route("/students", get(list_students_handler).post(create_student_handler))
        .route(
            "/students/{id}",
            get(get_student_handler)
                .put(update_student_handler)
                .delete(delete_student_handler),
        )
        // Teachers
        .route("/teachers", get(list_teachers_handler).post(create_teacher_handler))
        .route(
            "/teachers/{id}",
            get(get_teacher_handler)
                .put(update_teacher_handler)
                .delete(delete_teacher_handler),
        )
        // Classes
        .route("/classes", get(list_classes_handler).post(create_class_handler))
        .route(
            "/classes/{id}",
            get(get_class_handler)
                .put(update_class_handler)
                .delete(delete_class_handler),
        )
        .route("/classes/{id}/students", get(class_roster_handler))
        // Id sequences
        .route("/sequences", get(list_sequences_handler))
        .route("/sequences/{key}", get(get_sequence_handler))
        .with_state(state)
}

/// Panic recovery, request tracing and CORS shared by every route
pub fn with_api_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// Build main application router
pub fn create_app(state: AppState) -> Router {
    with_api_layers(Router::new().nest("/api/v1", create_school_router(state)))
}
