mod common;

use axum::http::StatusCode;
use common::{multipart_body, spawn_app, spawn_app_with};
use school_portal::{AppConfig, models::Role};
use serde_json::json;

const PDF_BYTES: &[u8] = b"%PDF-1.4 test document";

#[tokio::test]
async fn test_private_upload_is_only_visible_to_owner_and_admin() {
    let app = spawn_app();
    let (_, admin_token) = app.seed_user(Role::Admin, "admin@school.test").await;
    let (teacher, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (_, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;

    let uploaded = app
        .upload(
            &teacher_token,
            multipart_body(
                &[("title", "Exam draft"), ("type", "academic"), ("tags", "exam, term1")],
                Some(("exam.pdf", "application/pdf", PDF_BYTES)),
            ),
        )
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    let document = uploaded.json();
    assert_eq!(document["visibility"], "private");
    assert_eq!(document["type"], "academic");
    assert_eq!(document["uploader_id"], teacher.id.to_string());
    assert_eq!(document["file_size"], PDF_BYTES.len());
    assert_eq!(document["tags"], json!(["exam", "term1"]));

    let file_key = document["file_key"].as_str().unwrap();
    assert!(file_key.starts_with("documents/") && file_key.ends_with(".pdf"));
    assert!(app.storage.contains(file_key).await);
    assert_eq!(
        app.storage.content_type(file_key).await.as_deref(),
        Some("application/pdf")
    );

    let uri = format!("/api/documents/{}", document["id"].as_str().unwrap());

    let student_list = app.get("/api/documents", &student_token).await;
    assert!(student_list.json().as_array().unwrap().is_empty());

    let student_read = app.get(&uri, &student_token).await;
    assert_eq!(student_read.status, StatusCode::FORBIDDEN);

    let admin_read = app.get(&uri, &admin_token).await;
    assert_eq!(admin_read.status, StatusCode::OK);

    let owner_list = app.get("/api/documents", &teacher_token).await;
    assert_eq!(owner_list.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restricted_document_shared_with_role() {
    let app = spawn_app();
    let (_, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (_, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;
    let (_, parent_token) = app.seed_user(Role::Parent, "parent@school.test").await;

    let uploaded = app
        .upload(
            &teacher_token,
            multipart_body(
                &[
                    ("title", "Reading list"),
                    ("type", "course_material"),
                    ("visibility", "restricted"),
                    ("access_roles", "student"),
                ],
                Some(("notes.pdf", "application/pdf", PDF_BYTES)),
            ),
        )
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert_eq!(uploaded.json()["access_roles"], json!(["student"]));
    let id = uploaded.json()["id"].as_str().unwrap().to_string();

    let student_list = app.get("/api/documents", &student_token).await;
    assert_eq!(student_list.json().as_array().unwrap().len(), 1);

    let parent_read = app.get(&format!("/api/documents/{}", id), &parent_token).await;
    assert_eq!(parent_read.status, StatusCode::FORBIDDEN);

    let download = app
        .get(&format!("/api/documents/{}/download", id), &student_token)
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.headers["content-type"], "application/pdf");
    assert_eq!(
        download.headers["content-disposition"],
        "attachment; filename=\"notes.pdf\""
    );
    assert_eq!(download.body, PDF_BYTES);

    let after = app.get(&format!("/api/documents/{}", id), &student_token).await;
    assert_eq!(after.json()["download_count"], 1);
    assert!(!after.json()["last_download_date"].is_null());
}

#[tokio::test]
async fn test_access_roles_accept_repeated_and_comma_separated_fields() {
    let app = spawn_app();
    let (_, token) = app.seed_user(Role::Admin, "admin@school.test").await;

    let uploaded = app
        .upload(
            &token,
            multipart_body(
                &[
                    ("title", "Staff memo"),
                    ("visibility", "restricted"),
                    ("access_roles", "teacher, parent"),
                    ("access_roles", "student"),
                    ("access_roles", "teacher"),
                ],
                Some(("memo.png", "image/png", &b"\x89PNG fake"[..])),
            ),
        )
        .await;

    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert_eq!(
        uploaded.json()["access_roles"],
        json!(["teacher", "parent", "student"])
    );
    assert!(uploaded.json()["file_key"].as_str().unwrap().ends_with(".png"));
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = spawn_app();
    let (_, token) = app.seed_user(Role::Teacher, "teacher@school.test").await;

    let missing_file = app
        .upload(&token, multipart_body(&[("title", "No file")], None))
        .await;
    assert_eq!(missing_file.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_file.message(), "file is required");

    let wrong_type = app
        .upload(
            &token,
            multipart_body(
                &[("title", "Script")],
                Some(("run.sh", "text/x-shellscript", &b"echo hi"[..])),
            ),
        )
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.message(), "file type text/x-shellscript is not allowed");

    let no_roles = app
        .upload(
            &token,
            multipart_body(
                &[("title", "Secret"), ("visibility", "restricted")],
                Some(("s.pdf", "application/pdf", PDF_BYTES)),
            ),
        )
        .await;
    assert_eq!(no_roles.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        no_roles.message(),
        "at least one access role is required for restricted visibility"
    );

    let no_title = app
        .upload(
            &token,
            multipart_body(&[], Some(("s.pdf", "application/pdf", PDF_BYTES))),
        )
        .await;
    assert_eq!(no_title.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_title.message(), "title is required");

    let bad_visibility = app
        .upload(
            &token,
            multipart_body(
                &[("title", "Odd"), ("visibility", "everyone")],
                Some(("s.pdf", "application/pdf", PDF_BYTES)),
            ),
        )
        .await;
    assert_eq!(bad_visibility.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.storage.object_count().await, 0);
}

#[tokio::test]
async fn test_upload_size_limit() {
    let config = AppConfig {
        max_file_size: 16,
        ..AppConfig::default()
    };
    let app = spawn_app_with(config);
    let (_, token) = app.seed_user(Role::Teacher, "teacher@school.test").await;

    let too_big = app
        .upload(
            &token,
            multipart_body(
                &[("title", "Large")],
                Some(("big.pdf", "application/pdf", &[b'x'; 64][..])),
            ),
        )
        .await;

    assert_eq!(too_big.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.storage.object_count().await, 0);
}

#[tokio::test]
async fn test_only_uploader_or_admin_can_modify() {
    let app = spawn_app();
    let (_, admin_token) = app.seed_user(Role::Admin, "admin@school.test").await;
    let (_, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (_, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;

    let document = app
        .upload(
            &teacher_token,
            multipart_body(
                &[("title", "Timetable"), ("visibility", "public")],
                Some(("t.pdf", "application/pdf", PDF_BYTES)),
            ),
        )
        .await
        .json();
    let uri = format!("/api/documents/{}", document["id"].as_str().unwrap());
    let file_key = document["file_key"].as_str().unwrap().to_string();

    // Public documents are readable by everyone, but not writable.
    assert_eq!(app.get(&uri, &student_token).await.status, StatusCode::OK);
    let student_patch = app
        .patch(&uri, &student_token, json!({"title": "Hacked"}))
        .await;
    assert_eq!(student_patch.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.delete(&uri, &student_token).await.status,
        StatusCode::FORBIDDEN
    );

    let invalid = app
        .patch(&uri, &teacher_token, json!({"visibility": "restricted"}))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let restricted = app
        .patch(
            &uri,
            &teacher_token,
            json!({"visibility": "restricted", "access_roles": ["teacher"], "tags": ["2025"]}),
        )
        .await;
    assert_eq!(restricted.status, StatusCode::OK);
    assert_eq!(restricted.json()["title"], "Timetable");
    assert_eq!(app.get(&uri, &student_token).await.status, StatusCode::FORBIDDEN);

    let renamed = app
        .patch(&uri, &admin_token, json!({"title": "Timetable v2"}))
        .await;
    assert_eq!(renamed.json()["title"], "Timetable v2");

    let deleted = app.delete(&uri, &teacher_token).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!app.storage.contains(&file_key).await);
    assert_eq!(app.get(&uri, &admin_token).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_filters() {
    let app = spawn_app();
    let (_, token) = app.seed_user(Role::Admin, "admin@school.test").await;

    for (title, doc_type, tags) in [
        ("Invoice", "financial", "fees,2024"),
        ("Report card", "report", "term1"),
        ("Certificate", "certificate", "2024"),
    ] {
        let response = app
            .upload(
                &token,
                multipart_body(
                    &[("title", title), ("type", doc_type), ("tags", tags)],
                    Some(("f.pdf", "application/pdf", PDF_BYTES)),
                ),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let tagged = app.get("/api/documents?tags=2024,term9", &token).await.json();
    let titles: Vec<&str> = tagged
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Certificate", "Invoice"]);

    let reports = app.get("/api/documents?type=report", &token).await.json();
    assert_eq!(reports.as_array().unwrap().len(), 1);
    assert_eq!(reports[0]["title"], "Report card");
}

#[tokio::test]
async fn test_storage_failure_is_reported_without_details() {
    use axum::http::{Method, Request, header};
    use school_portal::{
        AppState, InMemoryRepository, MockStorageService, auth::issue_token,
        create_router, models::NewUser, repository::Repository,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    let repo = Arc::new(InMemoryRepository::new());
    let config = AppConfig::default();
    let teacher = repo
        .create_user(NewUser {
            email: "teacher@school.test".to_string(),
            password_hash: "unused".to_string(),
            first_name: "Test".to_string(),
            last_name: "Teacher".to_string(),
            role: Role::Teacher,
            phone_number: None,
            address: None,
        })
        .await
        .unwrap();
    let token = issue_token(&config, teacher.id).unwrap();

    let router = create_router(AppState {
        repo: repo.clone(),
        storage: Arc::new(MockStorageService::new_failing()),
        config,
    });

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/documents")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .body(axum::body::Body::from(multipart_body(
            &[("title", "Doomed")],
            Some(("d.pdf", "application/pdf", PDF_BYTES)),
        )))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["message"], "an unexpected error has occurred");

    assert!(documents_visible_to(&repo, teacher.id).await.is_empty());
}

async fn documents_visible_to(
    repo: &school_portal::InMemoryRepository,
    uploader: uuid::Uuid,
) -> Vec<school_portal::models::Document> {
    use school_portal::{access::Requester, models::DocumentFilter, repository::Repository};
    repo.list_documents(
        &Requester::new(uploader, Role::Teacher),
        &DocumentFilter::default(),
    )
    .await
    .unwrap()
}
