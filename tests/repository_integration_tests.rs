//! Round trips against a real Postgres. Run with `cargo test -- --ignored` and a
//! `DATABASE_URL` pointing at a disposable database.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use school_portal::{
    access::Requester,
    models::{
        CreateClassRequest, CreateCourseRequest, CreateScheduleRequest, DayOfWeek,
        DocumentFilter, DocumentType, MessagePriority, MessageType, NewDocument, NewMessage,
        NewStudent, NewTeacher, NewUser, Recurrence, Role, UpdateClassRequest, User, UserChanges,
        Visibility,
    },
    repository::{
        ClassUpdate, EnrollmentOutcome, PostgresRepository, Repository, RepositoryError,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    repo.create_user(NewUser {
        email: format!("{}@school.test", unique(role.as_str())),
        password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholde".to_string(),
        first_name: "Integration".to_string(),
        last_name: role.to_string(),
        role,
        phone_number: None,
        address: None,
    })
    .await
    .expect("Failed to create test user")
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_round_trip_and_unique_email() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo, Role::Parent).await;
    assert!(user.is_active);

    let found = repo.find_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let duplicate = repo
        .create_user(NewUser {
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: "Copy".to_string(),
            last_name: "Cat".to_string(),
            role: Role::Parent,
            phone_number: None,
            address: None,
        })
        .await;
    assert!(matches!(duplicate, Err(RepositoryError::UniqueViolation(ref what)) if what == "email address"));

    let renamed = repo
        .update_user(
            user.id,
            UserChanges {
                first_name: Some("Renamed".to_string()),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.first_name, "Renamed");
    assert_eq!(renamed.last_name, user.last_name);

    let logged_in = repo.record_login(user.id).await.unwrap().unwrap();
    assert!(logged_in.last_login.is_some());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_enrollment_is_idempotent_and_capped() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo, Role::Student).await;
    let student = repo
        .create_student(NewStudent {
            user_id: user.id,
            student_id: unique("STD"),
        })
        .await
        .unwrap();
    let other_user = create_test_user(&repo, Role::Student).await;
    let other = repo
        .create_student(NewStudent {
            user_id: other_user.id,
            student_id: unique("STD"),
        })
        .await
        .unwrap();

    let class = repo
        .create_class(CreateClassRequest {
            name: unique("5A"),
            grade: "5".to_string(),
            academic_year: "2025-2026".to_string(),
            main_teacher_id: None,
            capacity: 1,
            room: None,
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(
        repo.enroll_student(class.id, student.id).await.unwrap(),
        EnrollmentOutcome::Enrolled
    );
    assert_eq!(
        repo.enroll_student(class.id, student.id).await.unwrap(),
        EnrollmentOutcome::AlreadyEnrolled
    );
    assert_eq!(
        repo.enroll_student(class.id, other.id).await.unwrap(),
        EnrollmentOutcome::ClassFull { capacity: 1 }
    );
    assert_eq!(
        repo.enroll_student(Uuid::new_v4(), other.id).await.unwrap(),
        EnrollmentOutcome::ClassNotFound
    );

    let roster = repo.list_class_students(class.id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, student.id);

    let shrink = repo
        .update_class(
            class.id,
            UpdateClassRequest {
                capacity: Some(0),
                ..UpdateClassRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(shrink, ClassUpdate::CapacityBelowEnrolled { enrolled: 1 }));

    assert!(repo.unenroll_student(class.id, student.id).await.unwrap());
    assert!(!repo.unenroll_student(class.id, student.id).await.unwrap());
    assert!(repo.delete_class(class.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_course_and_schedule_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let teacher_user = create_test_user(&repo, Role::Teacher).await;
    let teacher = repo
        .create_teacher(NewTeacher {
            user_id: teacher_user.id,
            employee_id: unique("TCH"),
        })
        .await
        .unwrap();
    let class = repo
        .create_class(CreateClassRequest {
            name: unique("6B"),
            grade: "6".to_string(),
            academic_year: "2025-2026".to_string(),
            main_teacher_id: Some(teacher.id),
            capacity: 25,
            room: Some("B12".to_string()),
            description: None,
        })
        .await
        .unwrap();

    let code = unique("MATH");
    let course = repo
        .create_course(CreateCourseRequest {
            name: "Mathematics".to_string(),
            code: code.clone(),
            subject: "Maths".to_string(),
            description: None,
            teacher_id: teacher.id,
            class_id: class.id,
            academic_year: "2025-2026".to_string(),
            semester: None,
            credits: 5,
        })
        .await
        .unwrap();
    assert_eq!(course.code, code);

    let schedule = repo
        .create_schedule(CreateScheduleRequest {
            course_id: course.id,
            class_id: class.id,
            teacher_id: teacher.id,
            day_of_week: DayOfWeek::Wednesday,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
            room: None,
            recurrence: Recurrence::Weekly,
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(schedule.course_id, course.id);

    assert!(repo.delete_schedule(schedule.id).await.unwrap());
    assert!(repo.delete_course(course.id).await.unwrap());
    assert!(repo.get_course(course.id).await.unwrap().is_none());
    assert!(repo.delete_class(class.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_document_listing_honours_visibility() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let uploader = create_test_user(&repo, Role::Teacher).await;
    let reader = create_test_user(&repo, Role::Parent).await;
    let tag = unique("tag");

    for (visibility, roles) in [
        (Visibility::Private, vec![]),
        (Visibility::Restricted, vec![Role::Parent]),
        (Visibility::Restricted, vec![Role::Student]),
        (Visibility::Public, vec![]),
    ] {
        repo.create_document(NewDocument {
            title: format!("{} doc", visibility.as_str()),
            document_type: DocumentType::Administrative,
            description: None,
            file_key: format!("documents/{}.pdf", Uuid::new_v4()),
            file_name: "doc.pdf".to_string(),
            file_size: 10,
            mime_type: "application/pdf".to_string(),
            uploader_id: uploader.id,
            visibility,
            access_roles: roles,
            tags: vec![tag.clone()],
        })
        .await
        .unwrap();
    }

    let filter = DocumentFilter {
        tags: Some(tag),
        ..DocumentFilter::default()
    };
    let visible = repo
        .list_documents(&Requester::new(reader.id, Role::Parent), &filter)
        .await
        .unwrap();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].visibility, Visibility::Public);

    let own = repo
        .list_documents(&Requester::new(uploader.id, Role::Teacher), &filter)
        .await
        .unwrap();
    assert_eq!(own.len(), 4);

    let counted = repo.record_download(own[0].id).await.unwrap().unwrap();
    assert_eq!(counted.download_count, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_message_soft_delete_and_expiry() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let sender = create_test_user(&repo, Role::Admin).await;
    let receiver = create_test_user(&repo, Role::Student).await;

    let new_message = |subject: &str, expiry| NewMessage {
        sender_id: sender.id,
        receiver_id: receiver.id,
        subject: subject.to_string(),
        content: "body".to_string(),
        message_type: MessageType::Announcement,
        priority: MessagePriority::Urgent,
        parent_message_id: None,
        tags: vec![],
        expiry_date: expiry,
    };

    let kept = repo
        .create_message(new_message("kept", None))
        .await
        .unwrap();
    repo.create_message(new_message("expired", Some(Utc::now() - Duration::minutes(5))))
        .await
        .unwrap();

    let inbox = repo.list_inbox(receiver.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].id, kept.id);

    let read = repo.mark_message_read(kept.id).await.unwrap().unwrap();
    assert!(read.read_at.is_some());

    assert!(repo.soft_delete_message(kept.id).await.unwrap());
    assert!(repo.get_message(kept.id).await.unwrap().is_none());
    assert!(repo.list_sent(sender.id).await.unwrap().is_empty());
}
