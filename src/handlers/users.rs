use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, hash_password, issue_token, verify_password},
    error::ApiError,
    models::{
        Acknowledgement, AuthResponse, ChangePasswordRequest, CreateUserRequest, LoginRequest,
        NewStudent, NewTeacher, NewUser, Role, UpdateProfileRequest, UpdateUserRequest, User,
        UserChanges, UserDetails, UserFilter, UserProfile,
    },
    repository::RepositoryState,
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

const BAD_CREDENTIALS: &str = "incorrect email or password";
const EMAIL_TAKEN: &str = "email address is already in use";

/// Emails are compared and stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// registration_number
///
/// Human-facing identifier for a new profile: prefix, creation time in milliseconds and
/// a short random suffix (`STD1718000000000A1B2`).
pub fn registration_number(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("{}{}{}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// ensure_role_profile
///
/// Students and teachers always have their role-specific record. Creates the missing
/// one for `user`; a no-op for other roles or when the record already exists.
pub async fn ensure_role_profile(repo: &RepositoryState, user: &User) -> Result<(), ApiError> {
    match user.role {
        Role::Student => {
            if repo.get_student_by_user(user.id).await?.is_none() {
                let student = repo
                    .create_student(NewStudent {
                        user_id: user.id,
                        student_id: registration_number("STD"),
                    })
                    .await?;
                tracing::info!(user_id = %user.id, student_id = %student.student_id, "student profile created");
            }
        }
        Role::Teacher => {
            if repo.get_teacher_by_user(user.id).await?.is_none() {
                let teacher = repo
                    .create_teacher(NewTeacher {
                        user_id: user.id,
                        employee_id: registration_number("TCH"),
                    })
                    .await?;
                tracing::info!(user_id = %user.id, employee_id = %teacher.employee_id, "teacher profile created");
            }
        }
        Role::Admin | Role::Parent => {}
    }
    Ok(())
}

/// Attaches the student/teacher record to the public user view.
pub async fn user_details(repo: &RepositoryState, user: User) -> Result<UserDetails, ApiError> {
    let student = match user.role {
        Role::Student => repo.get_student_by_user(user.id).await?,
        _ => None,
    };
    let teacher = match user.role {
        Role::Teacher => repo.get_teacher_by_user(user.id).await?,
        _ => None,
    };
    Ok(UserDetails {
        user: UserProfile::from(user),
        student,
        teacher,
    })
}

async fn ensure_email_available(
    repo: &RepositoryState,
    email: &str,
    owner: Option<Uuid>,
) -> Result<(), ApiError> {
    match repo.find_user_by_email(email).await? {
        Some(existing) if Some(existing.id) != owner => {
            Err(ApiError::BadRequest(EMAIL_TAKEN.to_string()))
        }
        _ => Ok(()),
    }
}

async fn load_user(repo: &RepositoryState, id: Uuid) -> Result<User, ApiError> {
    repo.get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))
}

// --- Session & self-service ---

/// login
///
/// [Public Route] Exchanges email + password for a signed access token. Unknown emails
/// and wrong passwords get the same answer.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "user account is inactive".to_string(),
        ));
    }

    let user = state.repo.record_login(user.id).await?.unwrap_or(user);
    let token = issue_token(&state.config, user.id)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");

    Ok(Json(AuthResponse {
        user: UserProfile::from(user),
        token,
    }))
}

/// get_profile
///
/// [Authenticated Route] The acting user with their student or teacher record.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserDetails),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserDetails>, ApiError> {
    let user = load_user(&state.repo, auth_user.id).await?;
    Ok(Json(user_details(&state.repo, user).await?))
}

#[utoipa::path(
    patch,
    path = "/api/users/profile",
    tag = "users",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Validation failed or email taken", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        ensure_email_available(&state.repo, email, Some(auth_user.id)).await?;
    }

    let changes = UserChanges {
        email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_number: payload.phone_number,
        address: payload.address,
        ..UserChanges::default()
    };
    let user = state
        .repo
        .update_user(auth_user.id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserProfile::from(user)))
}

/// change_password
///
/// [Authenticated Route] The current password must be supplied and must match.
#[utoipa::path(
    post,
    path = "/api/users/change-password",
    tag = "users",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Acknowledgement),
        (status = 400, description = "New password too weak", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Current password incorrect", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn change_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<Acknowledgement>, ApiError> {
    let user = load_user(&state.repo, auth_user.id).await?;
    if !verify_password(payload.current_password, user.password_hash).await? {
        return Err(ApiError::Unauthorized(
            "current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(payload.new_password, state.config.bcrypt_cost).await?;
    state
        .repo
        .update_user(
            user.id,
            UserChanges {
                password_hash: Some(password_hash),
                ..UserChanges::default()
            },
        )
        .await?;
    tracing::info!(user_id = %user.id, "password changed");
    Ok(Json(Acknowledgement::new("password updated successfully")))
}

// --- Administration ---

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = [UserProfile]),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.repo.list_users(&filter).await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// create_user
///
/// [Admin Route] Creates an account and, for students and teachers, the matching
/// profile record. The response carries a token for the new user.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Validation failed or email taken", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    ensure_email_available(&state.repo, &email, None).await?;

    let password_hash = hash_password(payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: payload.role,
            phone_number: payload.phone_number,
            address: payload.address,
        })
        .await?;
    ensure_role_profile(&state.repo, &user).await?;

    let token = issue_token(&state.config, user.id)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserProfile::from(user),
            token,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserDetails),
        (status = 404, description = "Unknown user", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserDetails>, ApiError> {
    let user = load_user(&state.repo, id).await?;
    Ok(Json(user_details(&state.repo, user).await?))
}

/// update_user
///
/// [Admin Route] Partial update. Switching a user to `student` or `teacher` creates the
/// missing profile record.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 400, description = "Validation failed or email taken", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown user", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    load_user(&state.repo, id).await?;

    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        ensure_email_available(&state.repo, email, Some(id)).await?;
    }
    let password_hash = match payload.password {
        Some(password) => Some(hash_password(password, state.config.bcrypt_cost).await?),
        None => None,
    };

    let changes = UserChanges {
        email,
        password_hash,
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload.role,
        phone_number: payload.phone_number,
        address: payload.address,
        is_active: payload.is_active,
    };
    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    ensure_role_profile(&state.repo, &user).await?;

    Ok(Json(UserProfile::from(user)))
}

/// delete_user
///
/// [Admin Route] Soft delete: the account is deactivated and can no longer log in, but
/// its rows and history stay. Administrators cannot deactivate themselves.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = Acknowledgement),
        (status = 400, description = "Attempt to deactivate own account", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown user", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Acknowledgement>, ApiError> {
    if auth_user.id == id {
        return Err(ApiError::BadRequest(
            "you cannot deactivate your own account".to_string(),
        ));
    }
    state
        .repo
        .update_user(
            id,
            UserChanges {
                is_active: Some(false),
                ..UserChanges::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    tracing::info!(user_id = %id, by = %auth_user.id, "user deactivated");
    Ok(Json(Acknowledgement::new("user deactivated successfully")))
}
