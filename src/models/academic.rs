use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{DayOfWeek, RecordStatus, Recurrence, ScheduleStatus};
use crate::validation::check_schedule_window;

// --- Classes ---

/// Class
///
/// A group of students for one academic year (e.g. "6A", 2024-2025), optionally led by a
/// main teacher. Enrollment lives in the `student_classes` join table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub grade: String,
    pub academic_year: String,
    pub main_teacher_id: Option<Uuid>,
    pub capacity: i32,
    pub room: Option<String>,
    pub status: RecordStatus,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

fn default_capacity() -> i32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "grade is required"))]
    pub grade: String,
    #[validate(length(min = 1, message = "academic_year is required"))]
    pub academic_year: String,
    pub main_teacher_id: Option<Uuid>,
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: i32,
    pub room: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateClassRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "grade cannot be empty"))]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "academic_year cannot be empty"))]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_teacher_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassFilter {
    pub academic_year: Option<String>,
    pub status: Option<RecordStatus>,
}

// --- Courses ---

/// Course
///
/// A subject taught by one teacher to one class. `code` is unique across the school.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub subject: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub class_id: Uuid,
    pub academic_year: String,
    pub semester: Option<String>,
    pub credits: i32,
    pub status: RecordStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub class_id: Uuid,
    #[validate(length(min = 1, message = "academic_year is required"))]
    pub academic_year: String,
    pub semester: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits cannot be negative"))]
    pub credits: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "code cannot be empty"))]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "subject cannot be empty"))]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "credits cannot be negative"))]
    pub credits: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilter {
    pub class_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
}

// --- Schedules ---

/// Schedule
///
/// A recurring timetable slot. Invariants: `start_time < end_time` and
/// `start_date <= end_date` (checked on every write and by table constraints).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Schedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub day_of_week: DayOfWeek,
    #[ts(type = "string")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub recurrence: Recurrence,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[validate(schema(function = "validate_new_schedule_window"))]
#[ts(export)]
pub struct CreateScheduleRequest {
    pub course_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub day_of_week: DayOfWeek,
    #[ts(type = "string")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

fn validate_new_schedule_window(req: &CreateScheduleRequest) -> Result<(), ValidationError> {
    check_schedule_window(req.start_time, req.end_time, req.start_date, req.end_date)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateScheduleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScheduleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateScheduleRequest {
    /// Checks the time/date ordering of `current` with this update applied on top.
    pub fn check_merged_window(&self, current: &Schedule) -> Result<(), ValidationError> {
        check_schedule_window(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
            self.start_date.unwrap_or(current.start_date),
            self.end_date.unwrap_or(current.end_date),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleFilter {
    pub class_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub day_of_week: Option<DayOfWeek>,
}
