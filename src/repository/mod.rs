use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    access::Requester,
    models::{
        AdminDashboardStats, Class, ClassFilter, Course, CourseFilter, CreateClassRequest,
        CreateCourseRequest, CreateScheduleRequest, Document, DocumentFilter, Message, NewDocument,
        NewMessage, NewStudent, NewTeacher, NewUser, Schedule, ScheduleFilter, Student,
        StudentFilter, Teacher, TeacherFilter, UpdateClassRequest, UpdateCourseRequest,
        UpdateDocumentRequest, UpdateScheduleRequest, UpdateStudentRequest, UpdateTeacherRequest,
        User, UserChanges, UserFilter,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Persistence failures. Unique-constraint violations are split out so the API can
/// answer 409 instead of 500; the payload names the conflicting field.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate {0}")]
    UniqueViolation(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Outcome of an enrollment attempt. The capacity check and the insert happen under
/// one lock on the class, so concurrent attempts cannot overfill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled,
    AlreadyEnrolled,
    ClassFull { capacity: i32 },
    ClassNotFound,
}

/// Outcome of a class update. A new capacity is compared with the roster under the
/// same lock enrollments take.
#[derive(Debug, Clone)]
pub enum ClassUpdate {
    Updated(Class),
    NotFound,
    CapacityBelowEnrolled { enrolled: i64 },
}

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers only talk to
/// `Arc<dyn Repository>`, so the Postgres implementation and the in-memory one used by
/// the tests are interchangeable.
///
/// `Option` results mean "no such row"; updates use partial semantics where `None`
/// fields keep the stored value.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>>;
    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>>;

    // --- Students ---
    async fn create_student(&self, student: NewStudent) -> RepoResult<Student>;
    async fn get_student(&self, id: Uuid) -> RepoResult<Option<Student>>;
    async fn get_student_by_user(&self, user_id: Uuid) -> RepoResult<Option<Student>>;
    async fn list_students(&self, filter: &StudentFilter) -> RepoResult<Vec<Student>>;
    async fn update_student(
        &self,
        id: Uuid,
        req: UpdateStudentRequest,
    ) -> RepoResult<Option<Student>>;

    // --- Teachers ---
    async fn create_teacher(&self, teacher: NewTeacher) -> RepoResult<Teacher>;
    async fn get_teacher(&self, id: Uuid) -> RepoResult<Option<Teacher>>;
    async fn get_teacher_by_user(&self, user_id: Uuid) -> RepoResult<Option<Teacher>>;
    async fn list_teachers(&self, filter: &TeacherFilter) -> RepoResult<Vec<Teacher>>;
    async fn update_teacher(
        &self,
        id: Uuid,
        req: UpdateTeacherRequest,
    ) -> RepoResult<Option<Teacher>>;

    // --- Classes & enrollment ---
    async fn list_classes(&self, filter: &ClassFilter) -> RepoResult<Vec<Class>>;
    async fn get_class(&self, id: Uuid) -> RepoResult<Option<Class>>;
    async fn create_class(&self, req: CreateClassRequest) -> RepoResult<Class>;
    async fn update_class(&self, id: Uuid, req: UpdateClassRequest) -> RepoResult<ClassUpdate>;
    async fn delete_class(&self, id: Uuid) -> RepoResult<bool>;
    async fn list_class_students(&self, class_id: Uuid) -> RepoResult<Vec<Student>>;
    async fn enroll_student(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> RepoResult<EnrollmentOutcome>;
    async fn unenroll_student(&self, class_id: Uuid, student_id: Uuid) -> RepoResult<bool>;

    // --- Courses ---
    async fn list_courses(&self, filter: &CourseFilter) -> RepoResult<Vec<Course>>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course>;
    async fn update_course(
        &self,
        id: Uuid,
        req: UpdateCourseRequest,
    ) -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> RepoResult<bool>;

    // --- Schedules ---
    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepoResult<Vec<Schedule>>;
    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<Schedule>>;
    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<Schedule>;
    async fn update_schedule(
        &self,
        id: Uuid,
        req: UpdateScheduleRequest,
    ) -> RepoResult<Option<Schedule>>;
    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool>;

    // --- Documents ---
    /// Newest first, limited to what `viewer` may read (see `access::can_read`).
    async fn list_documents(
        &self,
        viewer: &Requester,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<Document>>;
    async fn get_document(&self, id: Uuid) -> RepoResult<Option<Document>>;
    async fn create_document(&self, doc: NewDocument) -> RepoResult<Document>;
    async fn update_document(
        &self,
        id: Uuid,
        req: UpdateDocumentRequest,
    ) -> RepoResult<Option<Document>>;
    async fn delete_document(&self, id: Uuid) -> RepoResult<bool>;
    /// Bumps `download_count` and stamps `last_download_date`.
    async fn record_download(&self, id: Uuid) -> RepoResult<Option<Document>>;

    // --- Messages (deleted rows are invisible to every method) ---
    async fn create_message(&self, msg: NewMessage) -> RepoResult<Message>;
    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>>;
    /// Received messages, newest first, excluding expired ones.
    async fn list_inbox(&self, user_id: Uuid) -> RepoResult<Vec<Message>>;
    /// Sent messages, newest first, excluding expired ones.
    async fn list_sent(&self, user_id: Uuid) -> RepoResult<Vec<Message>>;
    /// Direct replies `viewer` takes part in, oldest first.
    async fn list_replies(&self, parent_id: Uuid, viewer: Uuid) -> RepoResult<Vec<Message>>;
    async fn mark_message_read(&self, id: Uuid) -> RepoResult<Option<Message>>;
    async fn soft_delete_message(&self, id: Uuid) -> RepoResult<bool>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
