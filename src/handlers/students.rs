use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{Student, StudentFilter, UpdateStudentRequest},
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

/// list_students
///
/// [Staff Route] Student records, optionally filtered by grade and status.
#[utoipa::path(
    get,
    path = "/api/students",
    tag = "students",
    security(("bearer" = [])),
    params(StudentFilter),
    responses(
        (status = 200, description = "Students", body = [Student]),
        (status = 403, description = "Not staff", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StudentFilter>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.repo.list_students(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    tag = "students",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Student record id")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Unknown student", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Student>, ApiError> {
    state
        .repo
        .get_student(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("student not found".to_string()))
}

#[utoipa::path(
    patch,
    path = "/api/students/{id}",
    tag = "students",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Student record id")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Unknown student", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateStudentRequest>,
) -> Result<Json<Student>, ApiError> {
    state
        .repo
        .update_student(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("student not found".to_string()))
}
