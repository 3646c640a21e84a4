use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{ClassUpdate, EnrollmentOutcome, RepoResult, Repository, RepositoryError};
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

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     phone_number, address, is_active, last_login, created_at, updated_at";

const STUDENT_COLUMNS: &str = "id, user_id, student_id, date_of_birth, grade, section, \
     enrollment_date, status, created_at, updated_at";

const TEACHER_COLUMNS: &str = "id, user_id, employee_id, specialization, subjects, \
     employment_date, contract_type, status, created_at, updated_at";

const CLASS_COLUMNS: &str = "id, name, grade, academic_year, main_teacher_id, capacity, room, \
     status, description, created_at, updated_at";

const COURSE_COLUMNS: &str = "id, name, code, subject, description, teacher_id, class_id, \
     academic_year, semester, credits, status, created_at, updated_at";

const SCHEDULE_COLUMNS: &str = "id, course_id, class_id, teacher_id, day_of_week, start_time, \
     end_time, room, recurrence, start_date, end_date, status, notes, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, title, \"type\", description, file_key, file_name, \
     file_size, mime_type, uploader_id, visibility, access_roles, tags, download_count, \
     last_download_date, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, subject, content, \"type\", \
     priority, status, read_at, parent_message_id, tags, expiry_date, created_at, updated_at, \
     deleted_at";

/// Splits unique-constraint violations out of generic database errors, naming the
/// conflicting field after the constraint declared in the migrations.
fn map_db_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let what = match db.constraint() {
                Some("users_email_key") => "email address",
                Some("students_student_id_key") => "student id",
                Some("students_user_id_key") => "student profile",
                Some("teachers_employee_id_key") => "employee id",
                Some("teachers_user_id_key") => "teacher profile",
                Some("courses_code_key") => "course code",
                Some("student_classes_pkey") => "enrollment",
                _ => "record",
            };
            return RepositoryError::UniqueViolation(what.to_string());
        }
    }
    RepositoryError::Database(e)
}

/// Locks the class row for the rest of the transaction and returns its capacity.
async fn lock_class_capacity(
    tx: &mut Transaction<'_, Postgres>,
    class_id: Uuid,
) -> RepoResult<Option<i32>> {
    Ok(
        sqlx::query_scalar("SELECT capacity FROM classes WHERE id = $1 FOR UPDATE")
            .bind(class_id)
            .fetch_optional(&mut **tx)
            .await?,
    )
}

async fn count_enrolled(tx: &mut Transaction<'_, Postgres>, class_id: Uuid) -> RepoResult<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM student_classes WHERE class_id = $1")
            .bind(class_id)
            .fetch_one(&mut **tx)
            .await?,
    )
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at runtime
/// (`query_as::<_, T>`), so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_users
    ///
    /// Optional filters are appended with QueryBuilder so every value stays a bind
    /// parameter.
    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if let Some(role) = filter.role {
            builder.push(" AND role = ");
            builder.push_bind(role);
        }
        if let Some(is_active) = filter.is_active {
            builder.push(" AND is_active = ");
            builder.push_bind(is_active);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, phone_number, address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.role)
            .bind(user.phone_number)
            .bind(user.address)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    /// update_user
    ///
    /// COALESCE keeps the stored value for every `None` field.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                password_hash = COALESCE($3, password_hash), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                role = COALESCE($6, role), \
                phone_number = COALESCE($7, phone_number), \
                address = COALESCE($8, address), \
                is_active = COALESCE($9, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.role)
            .bind(changes.phone_number)
            .bind(changes.address)
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- STUDENTS ---

    async fn create_student(&self, student: NewStudent) -> RepoResult<Student> {
        let sql = format!(
            "INSERT INTO students (id, user_id, student_id) VALUES ($1, $2, $3) \
             RETURNING {STUDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&sql)
            .bind(Uuid::new_v4())
            .bind(student.user_id)
            .bind(student.student_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_student(&self, id: Uuid) -> RepoResult<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1");
        Ok(sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_student_by_user(&self, user_id: Uuid) -> RepoResult<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE user_id = $1");
        Ok(sqlx::query_as::<_, Student>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_students(&self, filter: &StudentFilter) -> RepoResult<Vec<Student>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students WHERE TRUE"));

        if let Some(grade) = &filter.grade {
            builder.push(" AND grade = ");
            builder.push_bind(grade.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_student(
        &self,
        id: Uuid,
        req: UpdateStudentRequest,
    ) -> RepoResult<Option<Student>> {
        let sql = format!(
            "UPDATE students SET \
                date_of_birth = COALESCE($2, date_of_birth), \
                grade = COALESCE($3, grade), \
                section = COALESCE($4, section), \
                enrollment_date = COALESCE($5, enrollment_date), \
                status = COALESCE($6, status), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {STUDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .bind(req.date_of_birth)
            .bind(req.grade)
            .bind(req.section)
            .bind(req.enrollment_date)
            .bind(req.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    // --- TEACHERS ---

    async fn create_teacher(&self, teacher: NewTeacher) -> RepoResult<Teacher> {
        let sql = format!(
            "INSERT INTO teachers (id, user_id, employee_id) VALUES ($1, $2, $3) \
             RETURNING {TEACHER_COLUMNS}"
        );
        sqlx::query_as::<_, Teacher>(&sql)
            .bind(Uuid::new_v4())
            .bind(teacher.user_id)
            .bind(teacher.employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_teacher(&self, id: Uuid) -> RepoResult<Option<Teacher>> {
        let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = $1");
        Ok(sqlx::query_as::<_, Teacher>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_teacher_by_user(&self, user_id: Uuid) -> RepoResult<Option<Teacher>> {
        let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE user_id = $1");
        Ok(sqlx::query_as::<_, Teacher>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_teachers(&self, filter: &TeacherFilter) -> RepoResult<Vec<Teacher>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE TRUE"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Teacher>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_teacher(
        &self,
        id: Uuid,
        req: UpdateTeacherRequest,
    ) -> RepoResult<Option<Teacher>> {
        let sql = format!(
            "UPDATE teachers SET \
                specialization = COALESCE($2, specialization), \
                subjects = COALESCE($3, subjects), \
                employment_date = COALESCE($4, employment_date), \
                contract_type = COALESCE($5, contract_type), \
                status = COALESCE($6, status), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {TEACHER_COLUMNS}"
        );
        sqlx::query_as::<_, Teacher>(&sql)
            .bind(id)
            .bind(req.specialization)
            .bind(req.subjects)
            .bind(req.employment_date)
            .bind(req.contract_type)
            .bind(req.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    // --- CLASSES ---

    async fn list_classes(&self, filter: &ClassFilter) -> RepoResult<Vec<Class>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CLASS_COLUMNS} FROM classes WHERE TRUE"));

        if let Some(year) = &filter.academic_year {
            builder.push(" AND academic_year = ");
            builder.push_bind(year.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY academic_year DESC, name ASC");

        Ok(builder
            .build_query_as::<Class>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_class(&self, id: Uuid) -> RepoResult<Option<Class>> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1");
        Ok(sqlx::query_as::<_, Class>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_class(&self, req: CreateClassRequest) -> RepoResult<Class> {
        let sql = format!(
            "INSERT INTO classes (id, name, grade, academic_year, main_teacher_id, capacity, room, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {CLASS_COLUMNS}"
        );
        sqlx::query_as::<_, Class>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .bind(req.grade)
            .bind(req.academic_year)
            .bind(req.main_teacher_id)
            .bind(req.capacity)
            .bind(req.room)
            .bind(req.description)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    /// Lowering the capacity locks the class row first, the same lock `enroll_student`
    /// takes, so the roster cannot grow between the count and the update.
    async fn update_class(&self, id: Uuid, req: UpdateClassRequest) -> RepoResult<ClassUpdate> {
        let mut tx = self.pool.begin().await?;

        if let Some(capacity) = req.capacity {
            if lock_class_capacity(&mut tx, id).await?.is_none() {
                return Ok(ClassUpdate::NotFound);
            }
            let enrolled = count_enrolled(&mut tx, id).await?;
            if i64::from(capacity) < enrolled {
                return Ok(ClassUpdate::CapacityBelowEnrolled { enrolled });
            }
        }

        let sql = format!(
            "UPDATE classes SET \
                name = COALESCE($2, name), \
                grade = COALESCE($3, grade), \
                academic_year = COALESCE($4, academic_year), \
                main_teacher_id = COALESCE($5, main_teacher_id), \
                capacity = COALESCE($6, capacity), \
                room = COALESCE($7, room), \
                status = COALESCE($8, status), \
                description = COALESCE($9, description), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {CLASS_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Class>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.grade)
            .bind(req.academic_year)
            .bind(req.main_teacher_id)
            .bind(req.capacity)
            .bind(req.room)
            .bind(req.status)
            .bind(req.description)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await?;

        Ok(match updated {
            Some(class) => ClassUpdate::Updated(class),
            None => ClassUpdate::NotFound,
        })
    }

    async fn delete_class(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_class_students(&self, class_id: Uuid) -> RepoResult<Vec<Student>> {
        let sql = r#"
            SELECT s.id, s.user_id, s.student_id, s.date_of_birth, s.grade, s.section,
                   s.enrollment_date, s.status, s.created_at, s.updated_at
            FROM students s
            JOIN student_classes sc ON sc.student_id = s.id
            WHERE sc.class_id = $1
            ORDER BY s.student_id ASC
        "#;
        Ok(sqlx::query_as::<_, Student>(sql)
            .bind(class_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// enroll_student
    ///
    /// Runs in one transaction holding a row lock on the class, so concurrent
    /// enrollments into the same class are serialized and the count stays exact.
    async fn enroll_student(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> RepoResult<EnrollmentOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(capacity) = lock_class_capacity(&mut tx, class_id).await? else {
            return Ok(EnrollmentOutcome::ClassNotFound);
        };

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM student_classes WHERE class_id = $1 AND student_id = $2)",
        )
        .bind(class_id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Ok(EnrollmentOutcome::AlreadyEnrolled);
        }

        if count_enrolled(&mut tx, class_id).await? >= i64::from(capacity) {
            return Ok(EnrollmentOutcome::ClassFull { capacity });
        }

        sqlx::query("INSERT INTO student_classes (class_id, student_id) VALUES ($1, $2)")
            .bind(class_id)
            .bind(student_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await?;

        Ok(EnrollmentOutcome::Enrolled)
    }

    async fn unenroll_student(&self, class_id: Uuid, student_id: Uuid) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM student_classes WHERE class_id = $1 AND student_id = $2")
                .bind(class_id)
                .bind(student_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COURSES ---

    async fn list_courses(&self, filter: &CourseFilter) -> RepoResult<Vec<Course>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COURSE_COLUMNS} FROM courses WHERE TRUE"));

        if let Some(class_id) = filter.class_id {
            builder.push(" AND class_id = ");
            builder.push_bind(class_id);
        }
        if let Some(teacher_id) = filter.teacher_id {
            builder.push(" AND teacher_id = ");
            builder.push_bind(teacher_id);
        }
        builder.push(" ORDER BY name ASC");

        Ok(builder
            .build_query_as::<Course>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        Ok(sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course> {
        let sql = format!(
            "INSERT INTO courses (id, name, code, subject, description, teacher_id, class_id, academic_year, semester, credits) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .bind(req.code)
            .bind(req.subject)
            .bind(req.description)
            .bind(req.teacher_id)
            .bind(req.class_id)
            .bind(req.academic_year)
            .bind(req.semester)
            .bind(req.credits)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_course(
        &self,
        id: Uuid,
        req: UpdateCourseRequest,
    ) -> RepoResult<Option<Course>> {
        let sql = format!(
            "UPDATE courses SET \
                name = COALESCE($2, name), \
                code = COALESCE($3, code), \
                subject = COALESCE($4, subject), \
                description = COALESCE($5, description), \
                teacher_id = COALESCE($6, teacher_id), \
                class_id = COALESCE($7, class_id), \
                academic_year = COALESCE($8, academic_year), \
                semester = COALESCE($9, semester), \
                credits = COALESCE($10, credits), \
                status = COALESCE($11, status), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.code)
            .bind(req.subject)
            .bind(req.description)
            .bind(req.teacher_id)
            .bind(req.class_id)
            .bind(req.academic_year)
            .bind(req.semester)
            .bind(req.credits)
            .bind(req.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- SCHEDULES ---

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepoResult<Vec<Schedule>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE TRUE"));

        if let Some(class_id) = filter.class_id {
            builder.push(" AND class_id = ");
            builder.push_bind(class_id);
        }
        if let Some(teacher_id) = filter.teacher_id {
            builder.push(" AND teacher_id = ");
            builder.push_bind(teacher_id);
        }
        if let Some(course_id) = filter.course_id {
            builder.push(" AND course_id = ");
            builder.push_bind(course_id);
        }
        if let Some(day) = filter.day_of_week {
            builder.push(" AND day_of_week = ");
            builder.push_bind(day);
        }
        builder.push(" ORDER BY day_of_week ASC, start_time ASC");

        Ok(builder
            .build_query_as::<Schedule>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<Schedule>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1");
        Ok(sqlx::query_as::<_, Schedule>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<Schedule> {
        let sql = format!(
            "INSERT INTO schedules (id, course_id, class_id, teacher_id, day_of_week, start_time, end_time, room, recurrence, start_date, end_date, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {SCHEDULE_COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.course_id)
            .bind(req.class_id)
            .bind(req.teacher_id)
            .bind(req.day_of_week)
            .bind(req.start_time)
            .bind(req.end_time)
            .bind(req.room)
            .bind(req.recurrence)
            .bind(req.start_date)
            .bind(req.end_date)
            .bind(req.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        req: UpdateScheduleRequest,
    ) -> RepoResult<Option<Schedule>> {
        let sql = format!(
            "UPDATE schedules SET \
                course_id = COALESCE($2, course_id), \
                class_id = COALESCE($3, class_id), \
                teacher_id = COALESCE($4, teacher_id), \
                day_of_week = COALESCE($5, day_of_week), \
                start_time = COALESCE($6, start_time), \
                end_time = COALESCE($7, end_time), \
                room = COALESCE($8, room), \
                recurrence = COALESCE($9, recurrence), \
                start_date = COALESCE($10, start_date), \
                end_date = COALESCE($11, end_date), \
                status = COALESCE($12, status), \
                notes = COALESCE($13, notes), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {SCHEDULE_COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&sql)
            .bind(id)
            .bind(req.course_id)
            .bind(req.class_id)
            .bind(req.teacher_id)
            .bind(req.day_of_week)
            .bind(req.start_time)
            .bind(req.end_time)
            .bind(req.room)
            .bind(req.recurrence)
            .bind(req.start_date)
            .bind(req.end_date)
            .bind(req.status)
            .bind(req.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- DOCUMENTS ---

    /// list_documents
    ///
    /// The visibility predicate mirrors `access::can_read`: admins see everything,
    /// everyone else sees public documents, their own uploads, and restricted documents
    /// listing their role. Tag filtering is an array overlap (`&&`).
    async fn list_documents(
        &self,
        viewer: &Requester,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<Document>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE TRUE"));

        if !viewer.is_admin() {
            builder.push(" AND (visibility = 'public' OR uploader_id = ");
            builder.push_bind(viewer.id);
            builder.push(" OR (visibility = 'restricted' AND ");
            builder.push_bind(viewer.role);
            builder.push(" = ANY(access_roles)))");
        }
        if let Some(document_type) = filter.document_type {
            builder.push(r#" AND "type" = "#);
            builder.push_bind(document_type);
        }
        if let Some(visibility) = filter.visibility {
            builder.push(" AND visibility = ");
            builder.push_bind(visibility);
        }
        let tags = filter.tag_list();
        if !tags.is_empty() {
            builder.push(" AND tags && ");
            builder.push_bind(tags);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_document(&self, id: Uuid) -> RepoResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_document(&self, doc: NewDocument) -> RepoResult<Document> {
        let sql = format!(
            r#"INSERT INTO documents (id, title, "type", description, file_key, file_name, file_size, mime_type, uploader_id, visibility, access_roles, tags)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {DOCUMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Document>(&sql)
            .bind(Uuid::new_v4())
            .bind(doc.title)
            .bind(doc.document_type)
            .bind(doc.description)
            .bind(doc.file_key)
            .bind(doc.file_name)
            .bind(doc.file_size)
            .bind(doc.mime_type)
            .bind(doc.uploader_id)
            .bind(doc.visibility)
            .bind(doc.access_roles)
            .bind(doc.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_document(
        &self,
        id: Uuid,
        req: UpdateDocumentRequest,
    ) -> RepoResult<Option<Document>> {
        let sql = format!(
            r#"UPDATE documents SET
                title = COALESCE($2, title),
                "type" = COALESCE($3, "type"),
                description = COALESCE($4, description),
                visibility = COALESCE($5, visibility),
                access_roles = COALESCE($6, access_roles),
                tags = COALESCE($7, tags),
                updated_at = NOW()
               WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.document_type)
            .bind(req.description)
            .bind(req.visibility)
            .bind(req.access_roles)
            .bind(req.tags)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_document(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_download(&self, id: Uuid) -> RepoResult<Option<Document>> {
        let sql = format!(
            "UPDATE documents SET download_count = download_count + 1, last_download_date = NOW() \
             WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- MESSAGES ---

    async fn create_message(&self, msg: NewMessage) -> RepoResult<Message> {
        let sql = format!(
            r#"INSERT INTO messages (id, sender_id, receiver_id, subject, content, "type", priority, parent_message_id, tags, expiry_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {MESSAGE_COLUMNS}"#
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(Uuid::new_v4())
            .bind(msg.sender_id)
            .bind(msg.receiver_id)
            .bind(msg.subject)
            .bind(msg.content)
            .bind(msg.message_type)
            .bind(msg.priority)
            .bind(msg.parent_message_id)
            .bind(msg.tags)
            .bind(msg.expiry_date)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>> {
        let sql =
            format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_inbox(&self, user_id: Uuid) -> RepoResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE receiver_id = $1 AND deleted_at IS NULL \
               AND (expiry_date IS NULL OR expiry_date > NOW()) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_sent(&self, user_id: Uuid) -> RepoResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE sender_id = $1 AND deleted_at IS NULL \
               AND (expiry_date IS NULL OR expiry_date > NOW()) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_replies(&self, parent_id: Uuid, viewer: Uuid) -> RepoResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE parent_message_id = $1 AND deleted_at IS NULL \
               AND (sender_id = $2 OR receiver_id = $2) \
             ORDER BY created_at ASC"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(parent_id)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn mark_message_read(&self, id: Uuid) -> RepoResult<Option<Message>> {
        let sql = format!(
            "UPDATE messages SET status = 'read', read_at = COALESCE(read_at, NOW()), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {MESSAGE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn soft_delete_message(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// All dashboard counters in a single round trip.
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let (
            total_users,
            active_users,
            total_students,
            total_teachers,
            total_classes,
            total_courses,
            total_documents,
        ) = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM users WHERE is_active),
                (SELECT COUNT(*) FROM students),
                (SELECT COUNT(*) FROM teachers),
                (SELECT COUNT(*) FROM classes),
                (SELECT COUNT(*) FROM courses),
                (SELECT COUNT(*) FROM documents)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminDashboardStats {
            total_users,
            active_users,
            total_students,
            total_teachers,
            total_classes,
            total_courses,
            total_documents,
        })
    }
}
