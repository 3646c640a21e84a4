//! Request validation layer.
//!
//! Field rules are declared with `validator` derives on the payload structs in `models`;
//! this module holds the custom rule functions they reference and the extractors that
//! run them before a handler sees the request.

use std::borrow::Cow;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::{
    error::ApiError,
    models::{Role, Visibility},
};

const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn rule_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// At least 8 characters drawn from `[A-Za-z0-9@$!%*?&]`, with one lowercase letter,
/// one uppercase letter, one digit and one special character.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(rule_error(
            "password_length",
            "password must be at least 8 characters long",
        ));
    }

    let only_allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if only_allowed && has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        Err(rule_error(
            "password_strength",
            "password must contain an uppercase letter, a lowercase letter, a digit and a special character (@$!%*?&)",
        ))
    }
}

/// Optional leading `+`, then 10 to 15 digits.
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(rule_error("phone_number", "phone number is not valid"))
    }
}

/// Schedule ordering: the slot must end after it starts, and the date range must not
/// be inverted (a single-day range is fine).
pub fn check_schedule_window(
    start_time: NaiveTime,
    end_time: NaiveTime,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), ValidationError> {
    let mut problems = Vec::new();
    if start_time >= end_time {
        problems.push("start_time must be before end_time");
    }
    if start_date > end_date {
        problems.push("start_date must be on or before end_date");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(rule_error("schedule_window", problems.join(", ")))
    }
}

/// Restricted documents must name at least one role.
pub fn check_access_roles(visibility: Visibility, roles: &[Role]) -> Result<(), ValidationError> {
    if visibility == Visibility::Restricted && roles.is_empty() {
        Err(rule_error(
            "access_roles",
            "at least one access role is required for restricted visibility",
        ))
    } else {
        Ok(())
    }
}

/// Converts a single rule failure into the API error the handlers return.
pub fn rule_violation(error: ValidationError) -> ApiError {
    ApiError::Validation(
        error
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.code.to_string()),
    )
}

// --- Extractors ---

/// ValidatedJson
///
/// `Json<T>` followed by `T::validate()`. Malformed bodies and rule failures both end
/// up in the error envelope with status 400.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// `Path<T>` with its rejection mapped into the error envelope.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

/// `Query<T>` with its rejection mapped into the error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}
