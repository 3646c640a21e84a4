//! Domain records, request payloads and query filters.
//!
//! Row structs derive `FromRow` for the Postgres repository, `ToSchema` for the OpenAPI
//! document and `TS` so the frontend gets matching TypeScript bindings.

mod academic;
mod document;
mod enums;
mod message;
mod profile;
mod user;

pub use academic::*;
pub use document::*;
pub use enums::*;
pub use message::*;
pub use profile::*;
pub use user::*;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Acknowledgement
///
/// Body returned by actions that have no resource to hand back (password change,
/// deactivation, unenrollment, deletions).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Acknowledgement {
    pub message: String,
}

impl Acknowledgement {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// AdminDashboardStats
///
/// Output schema for the administrative dashboard (GET /api/admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_classes: i64,
    pub total_courses: i64,
    pub total_documents: i64,
}
