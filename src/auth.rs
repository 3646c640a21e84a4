use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::{ADMIN_ONLY, Requester, STAFF, ensure_role},
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the HS256 access token issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Expiration time (seconds since the epoch). Always validated.
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument
/// to learn who is acting and with which role.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn requester(&self) -> Requester {
        Requester::new(self.id, self.role)
    }
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. An `AuthUser` already placed in the request extensions by `auth_middleware`.
/// 2. Local bypass: in `Env::Local` only, an `x-user-id` header naming an existing user.
/// 3. `Authorization: Bearer <jwt>`, decoded with the configured secret (expiry checked).
///
/// In every branch the user is reloaded from the repository, so deleted or deactivated
/// accounts are rejected even while their token is still valid.
///
/// Rejection: `ApiError::Unauthorized` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(*resolved);
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    if !user.is_active {
                        return Err(inactive_account());
                    }
                    return Ok(AuthUser {
                        id: user.id,
                        role: user.role,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(ApiError::unauthenticated)?;

        let claims = decode_token(token, &config.jwt_secret)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("user no longer exists".to_string()))?;

        if !user.is_active {
            return Err(inactive_account());
        }

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

fn inactive_account() -> ApiError {
    ApiError::Unauthorized("user account is inactive".to_string())
}

/// issue_token
///
/// Signs an access token for `user_id` valid for `config.jwt_expires_in` seconds.
pub fn issue_token(config: &AppConfig, user_id: Uuid) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let exp = now
        .checked_add(config.jwt_expires_in)
        .and_then(|exp| usize::try_from(exp).ok())
        .ok_or_else(|| ApiError::Internal("token lifetime is out of range".to_string()))?;
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
}

/// decode_token
///
/// HS256; `Validation::default()` checks `exp`.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("token has expired".to_string()),
        _ => {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized("invalid token".to_string())
        }
    })
}

/// hash_password
///
/// bcrypt is CPU-bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("failed to verify password: {}", e)))
}

// --- Route gates ---

/// auth_middleware
///
/// Enforces authentication for a route group. The resolved `AuthUser` is stored in the
/// request extensions so later extractors reuse it instead of hitting the repository
/// again.
pub async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// Role gate for administrator-only route groups.
pub async fn require_admin(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    ensure_role(auth_user.role, ADMIN_ONLY)?;
    Ok(next.run(request).await)
}

/// Role gate for staff route groups (admin, teacher).
pub async fn require_staff(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    ensure_role(auth_user.role, STAFF)?;
    Ok(next.run(request).await)
}
