mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::spawn_app;
use school_portal::{
    models::{MessagePriority, MessageType, NewMessage, Role},
    repository::Repository,
};
use serde_json::json;

#[tokio::test]
async fn test_message_lifecycle() {
    let app = spawn_app();
    let (student, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;
    let (teacher, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (_, parent_token) = app.seed_user(Role::Parent, "parent@school.test").await;

    let sent = app
        .post(
            "/api/messages",
            &student_token,
            json!({
                "receiver_id": teacher.id,
                "subject": "Homework",
                "content": "Is chapter 4 due on Monday?",
                "priority": "high"
            }),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    let message = sent.json();
    assert_eq!(message["sender_id"], student.id.to_string());
    assert_eq!(message["type"], "message");
    assert_eq!(message["status"], "sent");
    assert!(message.get("deleted_at").is_none());
    let uri = format!("/api/messages/{}", message["id"].as_str().unwrap());

    let outbox = app.get("/api/messages/sent", &student_token).await.json();
    assert_eq!(outbox.as_array().unwrap().len(), 1);
    let inbox = app.get("/api/messages/inbox", &teacher_token).await.json();
    assert_eq!(inbox.as_array().unwrap().len(), 1);

    // The sender opening the message does not mark it read.
    let by_sender = app.get(&uri, &student_token).await.json();
    assert_eq!(by_sender["status"], "sent");

    let by_receiver = app.get(&uri, &teacher_token).await.json();
    assert_eq!(by_receiver["status"], "read");
    assert!(!by_receiver["read_at"].is_null());

    let outsider = app.get(&uri, &parent_token).await;
    assert_eq!(outsider.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.delete(&uri, &parent_token).await.status,
        StatusCode::NOT_FOUND
    );

    let reply = app
        .post(
            "/api/messages",
            &teacher_token,
            json!({
                "receiver_id": student.id,
                "subject": "Re: Homework",
                "content": "Yes.",
                "parent_message_id": message["id"]
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let replies = app.get(&format!("{}/replies", uri), &student_token).await;
    assert_eq!(replies.status, StatusCode::OK);
    assert_eq!(replies.json()[0]["content"], "Yes.");
    assert_eq!(
        app.get(&format!("{}/replies", uri), &parent_token).await.status,
        StatusCode::NOT_FOUND
    );

    let deleted = app.delete(&uri, &teacher_token).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &student_token).await.status, StatusCode::NOT_FOUND);
    let outbox = app.get("/api/messages/sent", &student_token).await.json();
    assert!(outbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_replies_only_list_messages_the_viewer_takes_part_in() {
    let app = spawn_app();
    let (_, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;
    let (teacher, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (parent, parent_token) = app.seed_user(Role::Parent, "parent@school.test").await;

    let original = app
        .post(
            "/api/messages",
            &student_token,
            json!({"receiver_id": teacher.id, "subject": "Grades", "content": "Any news?"}),
        )
        .await
        .json();
    let replies_uri = format!("/api/messages/{}/replies", original["id"].as_str().unwrap());

    let aside = app
        .post(
            "/api/messages",
            &teacher_token,
            json!({
                "receiver_id": parent.id,
                "subject": "About your child",
                "content": "Private note for the parent.",
                "parent_message_id": original["id"]
            }),
        )
        .await;
    assert_eq!(aside.status, StatusCode::CREATED);

    let for_student = app.get(&replies_uri, &student_token).await;
    assert_eq!(for_student.status, StatusCode::OK);
    assert!(for_student.json().as_array().unwrap().is_empty());

    let for_teacher = app.get(&replies_uri, &teacher_token).await.json();
    assert_eq!(for_teacher.as_array().unwrap().len(), 1);
    assert_eq!(for_teacher[0]["content"], "Private note for the parent.");

    // The parent received the reply but is not part of the original thread.
    assert_eq!(
        app.get(&replies_uri, &parent_token).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_announcements_are_reserved_for_staff() {
    let app = spawn_app();
    let (_, student_token) = app.seed_user(Role::Student, "pupil@school.test").await;
    let (parent, _) = app.seed_user(Role::Parent, "parent@school.test").await;
    let (_, teacher_token) = app.seed_user(Role::Teacher, "teacher@school.test").await;

    let body = json!({
        "receiver_id": parent.id,
        "subject": "Trip",
        "content": "School trip on Friday",
        "type": "announcement"
    });

    let by_student = app.post("/api/messages", &student_token, body.clone()).await;
    assert_eq!(by_student.status, StatusCode::FORBIDDEN);

    let by_teacher = app.post("/api/messages", &teacher_token, body).await;
    assert_eq!(by_teacher.status, StatusCode::CREATED);
    assert_eq!(by_teacher.json()["type"], "announcement");
}

#[tokio::test]
async fn test_send_rejections() {
    let app = spawn_app();
    let (_, admin_token) = app.seed_user(Role::Admin, "admin@school.test").await;
    let (_, token) = app.seed_user(Role::Student, "pupil@school.test").await;
    let (gone, _) = app.seed_user(Role::Parent, "gone@school.test").await;
    let (parent, _) = app.seed_user(Role::Parent, "parent@school.test").await;
    app.delete(&format!("/api/users/{}", gone.id), &admin_token)
        .await;

    let unknown = app
        .post(
            "/api/messages",
            &token,
            json!({"receiver_id": uuid::Uuid::new_v4(), "subject": "Hi", "content": "Hello"}),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.message(), "receiver not found");

    let inactive = app
        .post(
            "/api/messages",
            &token,
            json!({"receiver_id": gone.id, "subject": "Hi", "content": "Hello"}),
        )
        .await;
    assert_eq!(inactive.status, StatusCode::BAD_REQUEST);
    assert_eq!(inactive.message(), "receiver account is inactive");

    let empty = app
        .post(
            "/api/messages",
            &token,
            json!({"receiver_id": gone.id, "subject": "", "content": ""}),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.message(), "content is required, subject is required");

    let orphan_reply = app
        .post(
            "/api/messages",
            &admin_token,
            json!({
                "receiver_id": parent.id,
                "subject": "Re",
                "content": "Hello",
                "parent_message_id": uuid::Uuid::new_v4()
            }),
        )
        .await;
    assert_eq!(orphan_reply.status, StatusCode::NOT_FOUND);
    assert_eq!(orphan_reply.message(), "parent message not found");

    let stale = app
        .post(
            "/api/messages",
            &admin_token,
            json!({
                "receiver_id": parent.id,
                "subject": "Later",
                "content": "Hello",
                "expiry_date": "2000-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);
    assert_eq!(stale.message(), "expiry_date must be in the future");
}

#[tokio::test]
async fn test_expired_messages_leave_the_inbox() {
    let app = spawn_app();
    let (sender, _) = app.seed_user(Role::Teacher, "teacher@school.test").await;
    let (receiver, receiver_token) = app.seed_user(Role::Student, "pupil@school.test").await;

    for (subject, expiry) in [
        ("Expired", Some(Utc::now() - Duration::hours(1))),
        ("Current", Some(Utc::now() + Duration::days(1))),
        ("Forever", None),
    ] {
        app.repo
            .create_message(NewMessage {
                sender_id: sender.id,
                receiver_id: receiver.id,
                subject: subject.to_string(),
                content: "notice".to_string(),
                message_type: MessageType::Notification,
                priority: MessagePriority::Normal,
                parent_message_id: None,
                tags: vec![],
                expiry_date: expiry,
            })
            .await
            .unwrap();
    }

    let inbox = app.get("/api/messages/inbox", &receiver_token).await.json();
    let subjects: Vec<&str> = inbox
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["subject"].as_str().unwrap())
        .collect();
    assert_eq!(subjects, vec!["Forever", "Current"]);
}
