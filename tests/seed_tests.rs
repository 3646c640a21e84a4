mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, spawn_app_with};
use school_portal::{
    AppConfig, RepositoryState, models::Role, repository::Repository, seed::bootstrap_admin,
};
use serde_json::json;

fn bootstrap_config(password: &str) -> AppConfig {
    AppConfig {
        admin_email: Some(" Root@School.test ".to_string()),
        admin_password: Some(password.to_string()),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_bootstrap_admin_is_created_once() {
    let app = spawn_app_with(bootstrap_config("Admin@1234"));
    let repo: RepositoryState = app.repo.clone();

    let created = bootstrap_admin(&repo, &app.config).await.unwrap().unwrap();
    assert_eq!(created.email, "root@school.test");
    assert_eq!(created.role, Role::Admin);
    assert!(created.is_active);

    let again = bootstrap_admin(&repo, &app.config).await.unwrap();
    assert!(again.is_none());

    let login = app
        .request(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"email": "root@school.test", "password": "Admin@1234"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.json()["user"]["role"], "admin");
}

#[tokio::test]
async fn test_bootstrap_admin_leaves_existing_account_alone() {
    let app = spawn_app_with(bootstrap_config("Admin@1234"));
    let (existing, _) = app.seed_user(Role::Teacher, "root@school.test").await;
    let repo: RepositoryState = app.repo.clone();

    assert!(bootstrap_admin(&repo, &app.config).await.unwrap().is_none());

    let stored = app.repo.get_user(existing.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Teacher);
}

#[tokio::test]
async fn test_bootstrap_admin_requires_both_values() {
    let app = spawn_app();
    let repo: RepositoryState = app.repo.clone();
    assert!(bootstrap_admin(&repo, &app.config).await.unwrap().is_none());

    let email_only = AppConfig {
        admin_email: Some("root@school.test".to_string()),
        ..AppConfig::default()
    };
    assert!(bootstrap_admin(&repo, &email_only).await.unwrap().is_none());
    assert!(
        app.repo
            .find_user_by_email("root@school.test")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_bootstrap_admin_rejects_weak_password() {
    let app = spawn_app_with(bootstrap_config("password"));
    let repo: RepositoryState = app.repo.clone();

    let error = bootstrap_admin(&repo, &app.config).await.unwrap_err();
    assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    assert!(
        app.repo
            .find_user_by_email("root@school.test")
            .await
            .unwrap()
            .is_none()
    );
}
