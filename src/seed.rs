//! Startup bootstrap of the first administrator account.

use crate::{
    auth::hash_password,
    config::AppConfig,
    error::ApiError,
    handlers::users::normalize_email,
    models::{NewUser, Role, User},
    repository::RepositoryState,
    validation::{rule_violation, validate_password_strength},
};

/// bootstrap_admin
///
/// Creates an admin account from `ADMIN_EMAIL`/`ADMIN_PASSWORD` when both are set and
/// no user holds that email yet. Returns the created user, or `None` when nothing had
/// to be done. An existing account is never modified.
pub async fn bootstrap_admin(
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<User>, ApiError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(None);
    };

    let email = normalize_email(email);
    if repo.find_user_by_email(&email).await?.is_some() {
        tracing::debug!(email = %email, "bootstrap admin already exists");
        return Ok(None);
    }

    validate_password_strength(password).map_err(rule_violation)?;
    let password_hash = hash_password(password.clone(), config.bcrypt_cost).await?;

    let admin = repo
        .create_user(NewUser {
            email,
            password_hash,
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
            role: Role::Admin,
            phone_number: None,
            address: None,
        })
        .await?;

    tracing::info!(user_id = %admin.id, email = %admin.email, "bootstrap admin created");
    Ok(Some(admin))
}
