use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, StatusCode, Uri, header, request::Parts},
};
use school_portal::{
    AppConfig, AppState, ApiError, InMemoryRepository, MockStorageService,
    auth::{AuthUser, Claims, DEV_USER_HEADER, issue_token},
    config::Env,
    models::{NewUser, Role, User, UserChanges},
    repository::Repository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_token(user_id: Uuid, secret: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn create_app_state(env: Env, repo: Arc<InMemoryRepository>) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config,
    }
}

async fn seed(repo: &InMemoryRepository, role: Role) -> User {
    repo.create_user(NewUser {
        email: format!("{}@school.test", Uuid::new_v4()),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "Auth".to_string(),
        last_name: "Subject".to_string(),
        role,
        phone_number: None,
        address: None,
    })
    .await
    .unwrap()
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn bearer_parts(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn unauthorized_message(result: Result<AuthUser, ApiError>) -> String {
    match result {
        Err(error) => {
            assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
            error.public_message()
        }
        Ok(user) => panic!("expected a rejection, resolved {:?}", user),
    }
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Teacher).await;
    let state = create_app_state(Env::Production, repo);

    let mut parts = bearer_parts(&create_token(user.id, TEST_JWT_SECRET, 3600));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.role, Role::Teacher);
}

#[tokio::test]
async fn test_issued_token_is_accepted() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Parent).await;
    let state = create_app_state(Env::Production, repo);

    let token = issue_token(&state.config, user.id).unwrap();
    let mut parts = bearer_parts(&token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(auth_user.role, Role::Parent);
}

#[test]
fn test_issue_token_rejects_out_of_range_lifetime() {
    let config = AppConfig {
        jwt_expires_in: i64::MAX,
        ..AppConfig::default()
    };

    let result = issue_token(&config, Uuid::new_v4());
    assert!(matches!(result, Err(ApiError::Internal(_))));
}

#[tokio::test]
async fn test_auth_failure_missing_header() {
    let state = create_app_state(Env::Production, Arc::new(InMemoryRepository::new()));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "authentication required");
}

#[tokio::test]
async fn test_auth_failure_without_bearer_prefix() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Student).await;
    let state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&create_token(user.id, TEST_JWT_SECRET, 3600)).unwrap(),
    );
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "authentication required");
}

#[tokio::test]
async fn test_auth_failure_expired_token() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Student).await;
    let state = create_app_state(Env::Production, repo);

    // Well past the default 60 second leeway.
    let mut parts = bearer_parts(&create_token(user.id, TEST_JWT_SECRET, -3600));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "token has expired");
}

#[tokio::test]
async fn test_auth_failure_malformed_and_foreign_tokens() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Student).await;
    let state = create_app_state(Env::Production, repo);

    let mut garbage = bearer_parts("not.a.jwt");
    let result = AuthUser::from_request_parts(&mut garbage, &state).await;
    assert_eq!(unauthorized_message(result), "invalid token");

    let mut foreign = bearer_parts(&create_token(user.id, "some-other-secret", 3600));
    let result = AuthUser::from_request_parts(&mut foreign, &state).await;
    assert_eq!(unauthorized_message(result), "invalid token");
}

#[tokio::test]
async fn test_auth_failure_unknown_user() {
    let state = create_app_state(Env::Production, Arc::new(InMemoryRepository::new()));

    let mut parts = bearer_parts(&create_token(Uuid::new_v4(), TEST_JWT_SECRET, 3600));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "user no longer exists");
}

#[tokio::test]
async fn test_auth_failure_inactive_user() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Teacher).await;
    repo.update_user(
        user.id,
        UserChanges {
            is_active: Some(false),
            ..UserChanges::default()
        },
    )
    .await
    .unwrap();
    let state = create_app_state(Env::Production, repo);

    let mut parts = bearer_parts(&create_token(user.id, TEST_JWT_SECRET, 3600));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "user account is inactive");
}

#[tokio::test]
async fn test_local_bypass_header_resolves_user() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Admin).await;
    let state = create_app_state(Env::Local, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        DEV_USER_HEADER,
        HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );
    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.role, Role::Admin);
}

#[tokio::test]
async fn test_bypass_header_ignored_in_production() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed(&repo, Role::Admin).await;
    let state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        DEV_USER_HEADER,
        HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "authentication required");
}

#[tokio::test]
async fn test_extension_short_circuits_resolution() {
    let state = create_app_state(Env::Production, Arc::new(InMemoryRepository::new()));
    let resolved = AuthUser {
        id: Uuid::new_v4(),
        role: Role::Student,
    };

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.extensions.insert(resolved);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, resolved.id);
}
