use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{Acknowledgement, Class, ClassFilter, CreateClassRequest, Student, UpdateClassRequest},
    repository::{ClassUpdate, EnrollmentOutcome, RepositoryState},
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

async fn load_class(repo: &RepositoryState, id: Uuid) -> Result<Class, ApiError> {
    repo.get_class(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("class not found".to_string()))
}

/// A class may only name an existing teacher record as its main teacher.
async fn check_main_teacher(repo: &RepositoryState, teacher_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(teacher_id) = teacher_id {
        if repo.get_teacher(teacher_id).await?.is_none() {
            return Err(ApiError::BadRequest("main teacher not found".to_string()));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/classes",
    tag = "classes",
    security(("bearer" = [])),
    params(ClassFilter),
    responses((status = 200, description = "Classes", body = [Class]))
)]
pub async fn list_classes(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ClassFilter>,
) -> Result<Json<Vec<Class>>, ApiError> {
    Ok(Json(state.repo.list_classes(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    tag = "classes",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class", body = Class),
        (status = 404, description = "Unknown class", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_class(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Class>, ApiError> {
    Ok(Json(load_class(&state.repo, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/classes",
    tag = "classes",
    security(("bearer" = [])),
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_class(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateClassRequest>,
) -> Result<(StatusCode, Json<Class>), ApiError> {
    check_main_teacher(&state.repo, payload.main_teacher_id).await?;
    let class = state.repo.create_class(payload).await?;
    tracing::info!(class_id = %class.id, name = %class.name, "class created");
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    patch,
    path = "/api/classes/{id}",
    tag = "classes",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Class id")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown class", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_class(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateClassRequest>,
) -> Result<Json<Class>, ApiError> {
    load_class(&state.repo, id).await?;
    check_main_teacher(&state.repo, payload.main_teacher_id).await?;

    match state.repo.update_class(id, payload).await? {
        ClassUpdate::Updated(class) => Ok(Json(class)),
        ClassUpdate::NotFound => Err(ApiError::NotFound("class not found".to_string())),
        ClassUpdate::CapacityBelowEnrolled { enrolled } => Err(ApiError::BadRequest(format!(
            "capacity cannot be lower than the {} students already enrolled",
            enrolled
        ))),
    }
}

/// delete_class
///
/// [Admin Route] Removes the class along with its enrollments, courses and schedules.
#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    tag = "classes",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown class", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_class(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_class(id).await? {
        tracing::info!(class_id = %id, "class deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("class not found".to_string()))
    }
}

// --- Enrollment ---

/// list_class_students
///
/// [Staff Route] The roster of a class, ordered by student number.
#[utoipa::path(
    get,
    path = "/api/classes/{id}/students",
    tag = "classes",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Enrolled students", body = [Student]),
        (status = 404, description = "Unknown class", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_class_students(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Student>>, ApiError> {
    load_class(&state.repo, id).await?;
    Ok(Json(state.repo.list_class_students(id).await?))
}

/// enroll_student
///
/// [Admin Route] Adds a student to a class. A class never holds more students than its
/// capacity, and a student cannot be enrolled twice.
#[utoipa::path(
    post,
    path = "/api/classes/{id}/students/{student_id}",
    tag = "classes",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Class id"),
        ("student_id" = Uuid, Path, description = "Student record id")
    ),
    responses(
        (status = 201, description = "Student enrolled", body = Acknowledgement),
        (status = 404, description = "Unknown class or student", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Already enrolled or class full", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn enroll_student(
    State(state): State<AppState>,
    ApiPath((class_id, student_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Acknowledgement>), ApiError> {
    load_class(&state.repo, class_id).await?;
    if state.repo.get_student(student_id).await?.is_none() {
        return Err(ApiError::NotFound("student not found".to_string()));
    }

    match state.repo.enroll_student(class_id, student_id).await? {
        EnrollmentOutcome::Enrolled => {
            tracing::info!(class_id = %class_id, student_id = %student_id, "student enrolled");
            Ok((
                StatusCode::CREATED,
                Json(Acknowledgement::new("student enrolled successfully")),
            ))
        }
        EnrollmentOutcome::AlreadyEnrolled => Err(ApiError::Conflict(
            "student is already enrolled in this class".to_string(),
        )),
        EnrollmentOutcome::ClassFull { capacity } => Err(ApiError::Conflict(format!(
            "class is at full capacity ({} students)",
            capacity
        ))),
        EnrollmentOutcome::ClassNotFound => Err(ApiError::NotFound("class not found".to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}/students/{student_id}",
    tag = "classes",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Class id"),
        ("student_id" = Uuid, Path, description = "Student record id")
    ),
    responses(
        (status = 204, description = "Student removed from the class"),
        (status = 404, description = "Not enrolled", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn unenroll_student(
    State(state): State<AppState>,
    ApiPath((class_id, student_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if state.repo.unenroll_student(class_id, student_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(
            "student is not enrolled in this class".to_string(),
        ))
    }
}
