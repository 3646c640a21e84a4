use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    access::{can_modify_document, can_read_document},
    auth::AuthUser,
    error::ApiError,
    models::{
        CreateDocumentRequest, Document, DocumentFilter, DocumentUploadForm, NewDocument, Role,
        UpdateDocumentRequest, split_list,
    },
    repository::RepositoryState,
    validation::{ApiPath, ApiQuery, ValidatedJson, rule_violation},
};

/// Accepted upload types and the extension used for their storage key.
const ALLOWED_MIME_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
];

/// Returns the storage extension for an allowed MIME type.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(mime_type))
        .map(|(_, ext)| *ext)
}

/// The file part of an upload, as received.
struct UploadedFile {
    file_name: String,
    mime_type: String,
    bytes: Bytes,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(e.body_text())
}

/// Loads a document and applies the read rule. Unknown ids are 404, unreadable ones 403.
async fn load_readable(
    repo: &RepositoryState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<Document, ApiError> {
    let document = repo
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    if !can_read_document(&auth_user.requester(), &document) {
        return Err(ApiError::access_denied());
    }
    Ok(document)
}

async fn load_modifiable(
    repo: &RepositoryState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<Document, ApiError> {
    let document = repo
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    if !can_modify_document(&auth_user.requester(), &document) {
        return Err(ApiError::access_denied());
    }
    Ok(document)
}

/// list_documents
///
/// [Authenticated Route] Newest first. Non-admins only see their own uploads, public
/// documents and restricted documents shared with their role.
#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "documents",
    security(("bearer" = [])),
    params(DocumentFilter),
    responses((status = 200, description = "Readable documents", body = [Document]))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiQuery(filter): ApiQuery<DocumentFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = state
        .repo
        .list_documents(&auth_user.requester(), &filter)
        .await?;
    Ok(Json(documents))
}

/// upload_document
///
/// [Authenticated Route] Multipart upload. The metadata is validated before the bytes
/// are written; if the row cannot be inserted afterwards, the stored object is removed
/// again.
#[utoipa::path(
    post,
    path = "/api/documents",
    tag = "documents",
    security(("bearer" = [])),
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded", body = Document),
        (status = 400, description = "Missing file, unsupported type, too large or invalid metadata", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn upload_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut request = CreateDocumentRequest::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes,
                });
            }
            "title" => request.title = field.text().await.map_err(multipart_error)?.trim().to_string(),
            "type" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.document_type = raw.parse().map_err(ApiError::BadRequest)?;
            }
            "description" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.description = Some(raw).filter(|d| !d.trim().is_empty());
            }
            "visibility" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.visibility = raw.parse().map_err(ApiError::BadRequest)?;
            }
            "access_roles" => {
                let raw = field.text().await.map_err(multipart_error)?;
                for role in split_list(&raw) {
                    let role: Role = role.parse().map_err(ApiError::BadRequest)?;
                    if !request.access_roles.contains(&role) {
                        request.access_roles.push(role);
                    }
                }
            }
            "tags" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.tags.extend(split_list(&raw));
            }
            other => tracing::debug!(field = %other, "ignoring unknown multipart field"),
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let extension = extension_for(&file.mime_type).ok_or_else(|| {
        ApiError::BadRequest(format!("file type {} is not allowed", file.mime_type))
    })?;
    if file.bytes.len() > state.config.max_file_size {
        return Err(ApiError::BadRequest(format!(
            "file size exceeds the {} MB limit",
            state.config.max_file_size / (1024 * 1024)
        )));
    }
    request.validate()?;

    let file_key = format!("documents/{}.{}", Uuid::new_v4(), extension);
    let file_size = file.bytes.len() as i64;
    state
        .storage
        .put_object(&file_key, file.bytes.to_vec(), &file.mime_type)
        .await?;

    let new_document = NewDocument {
        title: request.title,
        document_type: request.document_type,
        description: request.description,
        file_key: file_key.clone(),
        file_name: file.file_name,
        file_size,
        mime_type: file.mime_type,
        uploader_id: auth_user.id,
        visibility: request.visibility,
        access_roles: request.access_roles,
        tags: request.tags,
    };

    match state.repo.create_document(new_document).await {
        Ok(document) => {
            tracing::info!(document_id = %document.id, file_key = %document.file_key, "document uploaded");
            Ok((StatusCode::CREATED, Json(document)))
        }
        Err(e) => {
            if let Err(cleanup) = state.storage.delete_object(&file_key).await {
                tracing::warn!(file_key = %file_key, error = %cleanup, "failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "documents",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document metadata", body = Document),
        (status = 403, description = "Not readable by the caller", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown document", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(load_readable(&state.repo, &auth_user, id).await?))
}

/// download_document
///
/// [Authenticated Route] Returns the stored bytes as an attachment and bumps the
/// download counter.
#[utoipa::path(
    get,
    path = "/api/documents/{id}/download",
    tag = "documents",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 403, description = "Not readable by the caller", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown document or missing file", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn download_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = load_readable(&state.repo, &auth_user, id).await?;
    let bytes = state.storage.get_object(&document.file_key).await?;
    state.repo.record_download(document.id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[utoipa::path(
    patch,
    path = "/api/documents/{id}",
    tag = "documents",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document updated", body = Document),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not the uploader or an administrator", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown document", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    let current = load_modifiable(&state.repo, &auth_user, id).await?;
    payload
        .check_merged_access(&current)
        .map_err(rule_violation)?;

    state
        .repo
        .update_document(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))
}

/// delete_document
///
/// [Authenticated Route] Uploader or admin. The stored object goes first, then the row.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "documents",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the uploader or an administrator", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown document", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let document = load_modifiable(&state.repo, &auth_user, id).await?;
    state.storage.delete_object(&document.file_key).await?;

    if state.repo.delete_document(id).await? {
        tracing::info!(document_id = %id, "document deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("document not found".to_string()))
    }
}
