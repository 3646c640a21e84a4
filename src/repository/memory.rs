use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ClassUpdate, EnrollmentOutcome, RepoResult, Repository, RepositoryError};
use crate::{
    access::{Requester, can_read_document},
    models::{
        AdminDashboardStats, Class, ClassFilter, Course, CourseFilter, CreateClassRequest,
        CreateCourseRequest, CreateScheduleRequest, Document, DocumentFilter, Message,
        MessageStatus, NewDocument, NewMessage, NewStudent, NewTeacher, NewUser, RecordStatus,
        Schedule, ScheduleFilter, ScheduleStatus, Student, StudentFilter, StudentStatus, Teacher,
        TeacherFilter, TeacherStatus, UpdateClassRequest, UpdateCourseRequest,
        UpdateDocumentRequest, UpdateScheduleRequest, UpdateStudentRequest, UpdateTeacherRequest,
        User, UserChanges, UserFilter,
    },
};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    classes: Vec<Class>,
    enrollments: Vec<(Uuid, Uuid)>,
    courses: Vec<Course>,
    schedules: Vec<Schedule>,
    documents: Vec<Document>,
    messages: Vec<Message>,
}

fn duplicate(what: &str) -> RepositoryError {
    RepositoryError::UniqueViolation(what.to_string())
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process behind a tokio `RwLock`. Used by the API test
/// suites so the full router can be exercised without Postgres. Enforces the same
/// unique constraints as the migrations and returns rows in the same order as the
/// Postgres queries.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .rev()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .filter(|u| filter.is_active.is_none_or(|active| u.is_active == active))
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.email == user.email) {
            return Err(duplicate("email address"));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            phone_number: user.phone_number,
            address: user.address,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        if let Some(email) = &changes.email {
            if store.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(duplicate("email address"));
            }
        }
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if let Some(v) = changes.role {
            user.role = v;
        }
        if let Some(v) = changes.phone_number {
            user.phone_number = Some(v);
        }
        if let Some(v) = changes.address {
            user.address = Some(v);
        }
        if let Some(v) = changes.is_active {
            user.is_active = v;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.last_login = Some(Utc::now());
            user.clone()
        }))
    }

    // --- STUDENTS ---

    async fn create_student(&self, student: NewStudent) -> RepoResult<Student> {
        let mut store = self.store.write().await;
        if store.students.iter().any(|s| s.user_id == student.user_id) {
            return Err(duplicate("student profile"));
        }
        if store
            .students
            .iter()
            .any(|s| s.student_id == student.student_id)
        {
            return Err(duplicate("student id"));
        }
        let now = Utc::now();
        let created = Student {
            id: Uuid::new_v4(),
            user_id: student.user_id,
            student_id: student.student_id,
            date_of_birth: None,
            grade: None,
            section: None,
            enrollment_date: now.date_naive(),
            status: StudentStatus::Active,
            created_at: now,
            updated_at: now,
        };
        store.students.push(created.clone());
        Ok(created)
    }

    async fn get_student(&self, id: Uuid) -> RepoResult<Option<Student>> {
        let store = self.store.read().await;
        Ok(store.students.iter().find(|s| s.id == id).cloned())
    }

    async fn get_student_by_user(&self, user_id: Uuid) -> RepoResult<Option<Student>> {
        let store = self.store.read().await;
        Ok(store.students.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn list_students(&self, filter: &StudentFilter) -> RepoResult<Vec<Student>> {
        let store = self.store.read().await;
        Ok(store
            .students
            .iter()
            .rev()
            .filter(|s| {
                filter
                    .grade
                    .as_ref()
                    .is_none_or(|grade| s.grade.as_ref() == Some(grade))
            })
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .cloned()
            .collect())
    }

    async fn update_student(
        &self,
        id: Uuid,
        req: UpdateStudentRequest,
    ) -> RepoResult<Option<Student>> {
        let mut store = self.store.write().await;
        let Some(student) = store.students.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.date_of_birth {
            student.date_of_birth = Some(v);
        }
        if let Some(v) = req.grade {
            student.grade = Some(v);
        }
        if let Some(v) = req.section {
            student.section = Some(v);
        }
        if let Some(v) = req.enrollment_date {
            student.enrollment_date = v;
        }
        if let Some(v) = req.status {
            student.status = v;
        }
        student.updated_at = Utc::now();
        Ok(Some(student.clone()))
    }

    // --- TEACHERS ---

    async fn create_teacher(&self, teacher: NewTeacher) -> RepoResult<Teacher> {
        let mut store = self.store.write().await;
        if store.teachers.iter().any(|t| t.user_id == teacher.user_id) {
            return Err(duplicate("teacher profile"));
        }
        if store
            .teachers
            .iter()
            .any(|t| t.employee_id == teacher.employee_id)
        {
            return Err(duplicate("employee id"));
        }
        let now = Utc::now();
        let created = Teacher {
            id: Uuid::new_v4(),
            user_id: teacher.user_id,
            employee_id: teacher.employee_id,
            specialization: None,
            subjects: Vec::new(),
            employment_date: now.date_naive(),
            contract_type: Default::default(),
            status: TeacherStatus::Active,
            created_at: now,
            updated_at: now,
        };
        store.teachers.push(created.clone());
        Ok(created)
    }

    async fn get_teacher(&self, id: Uuid) -> RepoResult<Option<Teacher>> {
        let store = self.store.read().await;
        Ok(store.teachers.iter().find(|t| t.id == id).cloned())
    }

    async fn get_teacher_by_user(&self, user_id: Uuid) -> RepoResult<Option<Teacher>> {
        let store = self.store.read().await;
        Ok(store.teachers.iter().find(|t| t.user_id == user_id).cloned())
    }

    async fn list_teachers(&self, filter: &TeacherFilter) -> RepoResult<Vec<Teacher>> {
        let store = self.store.read().await;
        Ok(store
            .teachers
            .iter()
            .rev()
            .filter(|t| filter.status.is_none_or(|status| t.status == status))
            .cloned()
            .collect())
    }

    async fn update_teacher(
        &self,
        id: Uuid,
        req: UpdateTeacherRequest,
    ) -> RepoResult<Option<Teacher>> {
        let mut store = self.store.write().await;
        let Some(teacher) = store.teachers.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.specialization {
            teacher.specialization = Some(v);
        }
        if let Some(v) = req.subjects {
            teacher.subjects = v;
        }
        if let Some(v) = req.employment_date {
            teacher.employment_date = v;
        }
        if let Some(v) = req.contract_type {
            teacher.contract_type = v;
        }
        if let Some(v) = req.status {
            teacher.status = v;
        }
        teacher.updated_at = Utc::now();
        Ok(Some(teacher.clone()))
    }

    // --- CLASSES ---

    async fn list_classes(&self, filter: &ClassFilter) -> RepoResult<Vec<Class>> {
        let store = self.store.read().await;
        let mut classes: Vec<Class> = store
            .classes
            .iter()
            .filter(|c| {
                filter
                    .academic_year
                    .as_ref()
                    .is_none_or(|year| &c.academic_year == year)
            })
            .filter(|c| filter.status.is_none_or(|status| c.status == status))
            .cloned()
            .collect();
        classes.sort_by(|a, b| {
            b.academic_year
                .cmp(&a.academic_year)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(classes)
    }

    async fn get_class(&self, id: Uuid) -> RepoResult<Option<Class>> {
        let store = self.store.read().await;
        Ok(store.classes.iter().find(|c| c.id == id).cloned())
    }

    async fn create_class(&self, req: CreateClassRequest) -> RepoResult<Class> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let created = Class {
            id: Uuid::new_v4(),
            name: req.name,
            grade: req.grade,
            academic_year: req.academic_year,
            main_teacher_id: req.main_teacher_id,
            capacity: req.capacity,
            room: req.room,
            status: RecordStatus::Active,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        store.classes.push(created.clone());
        Ok(created)
    }

    async fn update_class(&self, id: Uuid, req: UpdateClassRequest) -> RepoResult<ClassUpdate> {
        let mut store = self.store.write().await;
        let Some(index) = store.classes.iter().position(|c| c.id == id) else {
            return Ok(ClassUpdate::NotFound);
        };
        let enrolled = store
            .enrollments
            .iter()
            .filter(|(class_id, _)| *class_id == id)
            .count() as i64;
        if req.capacity.is_some_and(|capacity| i64::from(capacity) < enrolled) {
            return Ok(ClassUpdate::CapacityBelowEnrolled { enrolled });
        }
        let class = &mut store.classes[index];
        if let Some(v) = req.name {
            class.name = v;
        }
        if let Some(v) = req.grade {
            class.grade = v;
        }
        if let Some(v) = req.academic_year {
            class.academic_year = v;
        }
        if let Some(v) = req.main_teacher_id {
            class.main_teacher_id = Some(v);
        }
        if let Some(v) = req.capacity {
            class.capacity = v;
        }
        if let Some(v) = req.room {
            class.room = Some(v);
        }
        if let Some(v) = req.status {
            class.status = v;
        }
        if let Some(v) = req.description {
            class.description = Some(v);
        }
        class.updated_at = Utc::now();
        Ok(ClassUpdate::Updated(class.clone()))
    }

    /// Mirrors the cascades declared in the migrations (enrollments, courses, schedules).
    async fn delete_class(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.classes.len();
        store.classes.retain(|c| c.id != id);
        if store.classes.len() == before {
            return Ok(false);
        }
        store.enrollments.retain(|(class_id, _)| *class_id != id);
        store.courses.retain(|c| c.class_id != id);
        let courses: Vec<Uuid> = store.courses.iter().map(|c| c.id).collect();
        store
            .schedules
            .retain(|s| s.class_id != id && courses.contains(&s.course_id));
        Ok(true)
    }

    async fn list_class_students(&self, class_id: Uuid) -> RepoResult<Vec<Student>> {
        let store = self.store.read().await;
        let mut students: Vec<Student> = store
            .enrollments
            .iter()
            .filter(|(c, _)| *c == class_id)
            .filter_map(|(_, s)| store.students.iter().find(|st| st.id == *s).cloned())
            .collect();
        students.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(students)
    }

    async fn enroll_student(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> RepoResult<EnrollmentOutcome> {
        let mut store = self.store.write().await;
        let Some(capacity) = store
            .classes
            .iter()
            .find(|c| c.id == class_id)
            .map(|c| c.capacity)
        else {
            return Ok(EnrollmentOutcome::ClassNotFound);
        };
        if store.enrollments.contains(&(class_id, student_id)) {
            return Ok(EnrollmentOutcome::AlreadyEnrolled);
        }
        let enrolled = store
            .enrollments
            .iter()
            .filter(|(id, _)| *id == class_id)
            .count() as i64;
        if enrolled >= i64::from(capacity) {
            return Ok(EnrollmentOutcome::ClassFull { capacity });
        }
        store.enrollments.push((class_id, student_id));
        Ok(EnrollmentOutcome::Enrolled)
    }

    async fn unenroll_student(&self, class_id: Uuid, student_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.enrollments.len();
        store
            .enrollments
            .retain(|pair| *pair != (class_id, student_id));
        Ok(store.enrollments.len() < before)
    }

    // --- COURSES ---

    async fn list_courses(&self, filter: &CourseFilter) -> RepoResult<Vec<Course>> {
        let store = self.store.read().await;
        let mut courses: Vec<Course> = store
            .courses
            .iter()
            .filter(|c| filter.class_id.is_none_or(|id| c.class_id == id))
            .filter(|c| filter.teacher_id.is_none_or(|id| c.teacher_id == id))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let store = self.store.read().await;
        Ok(store.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course> {
        let mut store = self.store.write().await;
        if store.courses.iter().any(|c| c.code == req.code) {
            return Err(duplicate("course code"));
        }
        let now = Utc::now();
        let created = Course {
            id: Uuid::new_v4(),
            name: req.name,
            code: req.code,
            subject: req.subject,
            description: req.description,
            teacher_id: req.teacher_id,
            class_id: req.class_id,
            academic_year: req.academic_year,
            semester: req.semester,
            credits: req.credits,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        store.courses.push(created.clone());
        Ok(created)
    }

    async fn update_course(
        &self,
        id: Uuid,
        req: UpdateCourseRequest,
    ) -> RepoResult<Option<Course>> {
        let mut store = self.store.write().await;
        if let Some(code) = &req.code {
            if store.courses.iter().any(|c| c.id != id && &c.code == code) {
                return Err(duplicate("course code"));
            }
        }
        let Some(course) = store.courses.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.name {
            course.name = v;
        }
        if let Some(v) = req.code {
            course.code = v;
        }
        if let Some(v) = req.subject {
            course.subject = v;
        }
        if let Some(v) = req.description {
            course.description = Some(v);
        }
        if let Some(v) = req.teacher_id {
            course.teacher_id = v;
        }
        if let Some(v) = req.class_id {
            course.class_id = v;
        }
        if let Some(v) = req.academic_year {
            course.academic_year = v;
        }
        if let Some(v) = req.semester {
            course.semester = Some(v);
        }
        if let Some(v) = req.credits {
            course.credits = v;
        }
        if let Some(v) = req.status {
            course.status = v;
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.courses.len();
        store.courses.retain(|c| c.id != id);
        if store.courses.len() == before {
            return Ok(false);
        }
        store.schedules.retain(|s| s.course_id != id);
        Ok(true)
    }

    // --- SCHEDULES ---

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepoResult<Vec<Schedule>> {
        let store = self.store.read().await;
        let mut schedules: Vec<Schedule> = store
            .schedules
            .iter()
            .filter(|s| filter.class_id.is_none_or(|id| s.class_id == id))
            .filter(|s| filter.teacher_id.is_none_or(|id| s.teacher_id == id))
            .filter(|s| filter.course_id.is_none_or(|id| s.course_id == id))
            .filter(|s| filter.day_of_week.is_none_or(|day| s.day_of_week == day))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| {
            (a.day_of_week as u8, a.start_time).cmp(&(b.day_of_week as u8, b.start_time))
        });
        Ok(schedules)
    }

    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<Schedule>> {
        let store = self.store.read().await;
        Ok(store.schedules.iter().find(|s| s.id == id).cloned())
    }

    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<Schedule> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let created = Schedule {
            id: Uuid::new_v4(),
            course_id: req.course_id,
            class_id: req.class_id,
            teacher_id: req.teacher_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
            room: req.room,
            recurrence: req.recurrence,
            start_date: req.start_date,
            end_date: req.end_date,
            status: ScheduleStatus::Scheduled,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };
        store.schedules.push(created.clone());
        Ok(created)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        req: UpdateScheduleRequest,
    ) -> RepoResult<Option<Schedule>> {
        let mut store = self.store.write().await;
        let Some(schedule) = store.schedules.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.course_id {
            schedule.course_id = v;
        }
        if let Some(v) = req.class_id {
            schedule.class_id = v;
        }
        if let Some(v) = req.teacher_id {
            schedule.teacher_id = v;
        }
        if let Some(v) = req.day_of_week {
            schedule.day_of_week = v;
        }
        if let Some(v) = req.start_time {
            schedule.start_time = v;
        }
        if let Some(v) = req.end_time {
            schedule.end_time = v;
        }
        if let Some(v) = req.room {
            schedule.room = Some(v);
        }
        if let Some(v) = req.recurrence {
            schedule.recurrence = v;
        }
        if let Some(v) = req.start_date {
            schedule.start_date = v;
        }
        if let Some(v) = req.end_date {
            schedule.end_date = v;
        }
        if let Some(v) = req.status {
            schedule.status = v;
        }
        if let Some(v) = req.notes {
            schedule.notes = Some(v);
        }
        schedule.updated_at = Utc::now();
        Ok(Some(schedule.clone()))
    }

    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.schedules.len();
        store.schedules.retain(|s| s.id != id);
        Ok(store.schedules.len() < before)
    }

    // --- DOCUMENTS ---

    async fn list_documents(
        &self,
        viewer: &Requester,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<Document>> {
        let store = self.store.read().await;
        let tags = filter.tag_list();
        Ok(store
            .documents
            .iter()
            .rev()
            .filter(|d| can_read_document(viewer, d))
            .filter(|d| filter.document_type.is_none_or(|t| d.document_type == t))
            .filter(|d| filter.visibility.is_none_or(|v| d.visibility == v))
            .filter(|d| tags.is_empty() || d.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect())
    }

    async fn get_document(&self, id: Uuid) -> RepoResult<Option<Document>> {
        let store = self.store.read().await;
        Ok(store.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn create_document(&self, doc: NewDocument) -> RepoResult<Document> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let created = Document {
            id: Uuid::new_v4(),
            title: doc.title,
            document_type: doc.document_type,
            description: doc.description,
            file_key: doc.file_key,
            file_name: doc.file_name,
            file_size: doc.file_size,
            mime_type: doc.mime_type,
            uploader_id: doc.uploader_id,
            visibility: doc.visibility,
            access_roles: doc.access_roles,
            tags: doc.tags,
            download_count: 0,
            last_download_date: None,
            created_at: now,
            updated_at: now,
        };
        store.documents.push(created.clone());
        Ok(created)
    }

    async fn update_document(
        &self,
        id: Uuid,
        req: UpdateDocumentRequest,
    ) -> RepoResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(doc) = store.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.title {
            doc.title = v;
        }
        if let Some(v) = req.document_type {
            doc.document_type = v;
        }
        if let Some(v) = req.description {
            doc.description = Some(v);
        }
        if let Some(v) = req.visibility {
            doc.visibility = v;
        }
        if let Some(v) = req.access_roles {
            doc.access_roles = v;
        }
        if let Some(v) = req.tags {
            doc.tags = v;
        }
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.documents.len();
        store.documents.retain(|d| d.id != id);
        Ok(store.documents.len() < before)
    }

    async fn record_download(&self, id: Uuid) -> RepoResult<Option<Document>> {
        let mut store = self.store.write().await;
        Ok(store.documents.iter_mut().find(|d| d.id == id).map(|doc| {
            doc.download_count += 1;
            doc.last_download_date = Some(Utc::now());
            doc.clone()
        }))
    }

    // --- MESSAGES ---

    async fn create_message(&self, msg: NewMessage) -> RepoResult<Message> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let created = Message {
            id: Uuid::new_v4(),
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            subject: msg.subject,
            content: msg.content,
            message_type: msg.message_type,
            priority: msg.priority,
            status: MessageStatus::Sent,
            read_at: None,
            parent_message_id: msg.parent_message_id,
            tags: msg.tags,
            expiry_date: msg.expiry_date,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.messages.push(created.clone());
        Ok(created)
    }

    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .cloned())
    }

    async fn list_inbox(&self, user_id: Uuid) -> RepoResult<Vec<Message>> {
        let store = self.store.read().await;
        let now = Utc::now();
        Ok(store
            .messages
            .iter()
            .rev()
            .filter(|m| m.receiver_id == user_id && m.deleted_at.is_none() && !m.is_expired(now))
            .cloned()
            .collect())
    }

    async fn list_sent(&self, user_id: Uuid) -> RepoResult<Vec<Message>> {
        let store = self.store.read().await;
        let now = Utc::now();
        Ok(store
            .messages
            .iter()
            .rev()
            .filter(|m| m.sender_id == user_id && m.deleted_at.is_none() && !m.is_expired(now))
            .cloned()
            .collect())
    }

    async fn list_replies(&self, parent_id: Uuid, viewer: Uuid) -> RepoResult<Vec<Message>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .filter(|m| m.parent_message_id == Some(parent_id) && m.deleted_at.is_none())
            .filter(|m| m.is_participant(viewer))
            .cloned()
            .collect())
    }

    async fn mark_message_read(&self, id: Uuid) -> RepoResult<Option<Message>> {
        let mut store = self.store.write().await;
        Ok(store
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .map(|msg| {
                let now = Utc::now();
                msg.status = MessageStatus::Read;
                msg.read_at = msg.read_at.or(Some(now));
                msg.updated_at = now;
                msg.clone()
            }))
    }

    async fn soft_delete_message(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        match store
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        {
            Some(msg) => {
                msg.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- DASHBOARD ---

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let store = self.store.read().await;
        Ok(AdminDashboardStats {
            total_users: store.users.len() as i64,
            active_users: store.users.iter().filter(|u| u.is_active).count() as i64,
            total_students: store.students.len() as i64,
            total_teachers: store.teachers.len() as i64,
            total_classes: store.classes.len() as i64,
            total_courses: store.courses.len() as i64,
            total_documents: store.documents.len() as i64,
        })
    }
}
