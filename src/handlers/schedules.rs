use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{CreateScheduleRequest, Schedule, ScheduleFilter, UpdateScheduleRequest},
    repository::RepositoryState,
    validation::{ApiPath, ApiQuery, ValidatedJson, rule_violation},
};

async fn check_references(
    repo: &RepositoryState,
    course_id: Option<Uuid>,
    class_id: Option<Uuid>,
    teacher_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(course_id) = course_id {
        if repo.get_course(course_id).await?.is_none() {
            return Err(ApiError::BadRequest("course not found".to_string()));
        }
    }
    if let Some(class_id) = class_id {
        if repo.get_class(class_id).await?.is_none() {
            return Err(ApiError::BadRequest("class not found".to_string()));
        }
    }
    if let Some(teacher_id) = teacher_id {
        if repo.get_teacher(teacher_id).await?.is_none() {
            return Err(ApiError::BadRequest("teacher not found".to_string()));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/schedules",
    tag = "schedules",
    security(("bearer" = [])),
    params(ScheduleFilter),
    responses((status = 200, description = "Timetable slots, by day then start time", body = [Schedule]))
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ScheduleFilter>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.repo.list_schedules(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    tag = "schedules",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 200, description = "Schedule", body = Schedule),
        (status = 404, description = "Unknown schedule", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Schedule>, ApiError> {
    state
        .repo
        .get_schedule(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("schedule not found".to_string()))
}

/// create_schedule
///
/// [Admin Route] The time/date ordering is checked by the payload's schema rule before
/// the handler runs; the references are checked here.
#[utoipa::path(
    post,
    path = "/api/schedules",
    tag = "schedules",
    security(("bearer" = [])),
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = Schedule),
        (status = 400, description = "Invalid time window or unknown reference", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    check_references(
        &state.repo,
        Some(payload.course_id),
        Some(payload.class_id),
        Some(payload.teacher_id),
    )
    .await?;
    let schedule = state.repo.create_schedule(payload).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// update_schedule
///
/// [Admin Route] The ordering rule is evaluated on the stored row with the update
/// applied, so moving only `end_time` before the existing `start_time` is rejected.
#[utoipa::path(
    patch,
    path = "/api/schedules/{id}",
    tag = "schedules",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Schedule id")),
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Schedule updated", body = Schedule),
        (status = 400, description = "Invalid time window or unknown reference", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown schedule", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    let current = state
        .repo
        .get_schedule(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("schedule not found".to_string()))?;

    payload
        .check_merged_window(&current)
        .map_err(rule_violation)?;
    check_references(
        &state.repo,
        payload.course_id,
        payload.class_id,
        payload.teacher_id,
    )
    .await?;

    state
        .repo
        .update_schedule(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("schedule not found".to_string()))
}

#[utoipa::path(
    delete,
    path = "/api/schedules/{id}",
    tag = "schedules",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown schedule", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_schedule(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("schedule not found".to_string()))
    }
}
