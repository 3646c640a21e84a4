use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{DocumentType, Role, Visibility};
use crate::validation::check_access_roles;

/// Document
///
/// A stored file plus its access metadata. The bytes live in object storage under
/// `file_key`; this row only references them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    // 'type' is a reserved keyword in Rust; the column and the JSON key keep the short name.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub file_key: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploader_id: Uuid,
    pub visibility: Visibility,
    pub access_roles: Vec<Role>,
    pub tags: Vec<String>,
    pub download_count: i32,
    #[ts(type = "string | null")]
    pub last_download_date: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CreateDocumentRequest
///
/// Metadata half of the multipart upload, assembled field by field by the upload
/// handler and validated before anything is written to storage.
#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = "validate_new_document_access"))]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub access_roles: Vec<Role>,
    pub tags: Vec<String>,
}

fn validate_new_document_access(req: &CreateDocumentRequest) -> Result<(), ValidationError> {
    check_access_roles(req.visibility, &req.access_roles)
}

/// DocumentUploadForm
///
/// OpenAPI description of the multipart body accepted by POST /api/documents.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub title: String,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    /// Repeated field or comma separated list.
    pub access_roles: Option<Vec<Role>>,
    /// Repeated field or comma separated list.
    pub tags: Option<Vec<String>>,
}

/// Repository input for a new document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub file_key: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploader_id: Uuid,
    pub visibility: Visibility,
    pub access_roles: Vec<Role>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDocumentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateDocumentRequest {
    /// Checks the restricted-visibility rule on `current` with this update applied.
    pub fn check_merged_access(&self, current: &Document) -> Result<(), ValidationError> {
        let visibility = self.visibility.unwrap_or(current.visibility);
        let roles = self.access_roles.as_ref().unwrap_or(&current.access_roles);
        check_access_roles(visibility, roles)
    }
}

/// Query parameters for GET /api/documents.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentFilter {
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
    pub visibility: Option<Visibility>,
    /// Comma separated; a document matches when it carries any of them.
    pub tags: Option<String>,
}

impl DocumentFilter {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
    }
}

/// Splits a comma separated form/query value, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
