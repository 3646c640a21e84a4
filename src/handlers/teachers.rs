use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{Teacher, TeacherFilter, UpdateTeacherRequest},
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

#[utoipa::path(
    get,
    path = "/api/teachers",
    tag = "teachers",
    security(("bearer" = [])),
    params(TeacherFilter),
    responses(
        (status = 200, description = "Teachers", body = [Teacher]),
        (status = 403, description = "Not staff", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_teachers(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TeacherFilter>,
) -> Result<Json<Vec<Teacher>>, ApiError> {
    Ok(Json(state.repo.list_teachers(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    tag = "teachers",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Teacher record id")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 404, description = "Unknown teacher", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_teacher(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Teacher>, ApiError> {
    state
        .repo
        .get_teacher(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("teacher not found".to_string()))
}

/// update_teacher
///
/// [Admin Route] Fills in or corrects the employment details of a teacher.
#[utoipa::path(
    patch,
    path = "/api/teachers/{id}",
    tag = "teachers",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Teacher record id")),
    request_body = UpdateTeacherRequest,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 404, description = "Unknown teacher", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_teacher(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTeacherRequest>,
) -> Result<Json<Teacher>, ApiError> {
    state
        .repo
        .update_teacher(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("teacher not found".to_string()))
}
