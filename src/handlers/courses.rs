use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{Course, CourseFilter, CreateCourseRequest, UpdateCourseRequest},
    repository::RepositoryState,
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

/// Referenced teacher and class must exist. Missing references are a client error
/// (400), not a missing resource.
async fn check_references(
    repo: &RepositoryState,
    teacher_id: Option<Uuid>,
    class_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(teacher_id) = teacher_id {
        if repo.get_teacher(teacher_id).await?.is_none() {
            return Err(ApiError::BadRequest("teacher not found".to_string()));
        }
    }
    if let Some(class_id) = class_id {
        if repo.get_class(class_id).await?.is_none() {
            return Err(ApiError::BadRequest("class not found".to_string()));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    security(("bearer" = [])),
    params(CourseFilter),
    responses((status = 200, description = "Courses", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CourseFilter>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.repo.list_courses(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Unknown course", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Course>, ApiError> {
    state
        .repo
        .get_course(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("course not found".to_string()))
}

/// create_course
///
/// [Admin Route] Course codes are unique; a duplicate code is answered with 409.
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    security(("bearer" = [])),
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Validation failed or unknown reference", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Course code already exists", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    check_references(&state.repo, Some(payload.teacher_id), Some(payload.class_id)).await?;
    let course = state.repo.create_course(payload).await?;
    tracing::info!(course_id = %course.id, code = %course.code, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    patch,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Validation failed or unknown reference", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown course", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    if state.repo.get_course(id).await?.is_none() {
        return Err(ApiError::NotFound("course not found".to_string()));
    }
    check_references(&state.repo, payload.teacher_id, payload.class_id).await?;

    state
        .repo
        .update_course(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("course not found".to_string()))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown course", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_course(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("course not found".to_string()))
    }
}
