use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{Message, MessageType, NewMessage, SendMessageRequest},
    repository::RepositoryState,
    validation::{ApiPath, ValidatedJson},
};

/// Messages are only visible to their two participants. Anyone else gets the same 404
/// as for a missing id, so message ids cannot be probed.
async fn load_visible(
    repo: &RepositoryState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<Message, ApiError> {
    repo.get_message(id)
        .await?
        .filter(|message| message.is_participant(auth_user.id))
        .ok_or_else(|| ApiError::NotFound("message not found".to_string()))
}

/// send_message
///
/// [Authenticated Route] The receiver must be an existing, active user. Notifications
/// and announcements can only be sent by staff.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    security(("bearer" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Validation failed or inactive receiver", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Message type reserved for staff", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown receiver or parent message", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if payload.message_type != MessageType::Message && !auth_user.role.is_staff() {
        return Err(ApiError::Forbidden(
            "only staff can send notifications and announcements".to_string(),
        ));
    }

    let receiver = state
        .repo
        .get_user(payload.receiver_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("receiver not found".to_string()))?;
    if !receiver.is_active {
        return Err(ApiError::BadRequest(
            "receiver account is inactive".to_string(),
        ));
    }

    if let Some(parent_id) = payload.parent_message_id {
        load_visible(&state.repo, &auth_user, parent_id)
            .await
            .map_err(|_| ApiError::NotFound("parent message not found".to_string()))?;
    }

    if payload.expiry_date.is_some_and(|expiry| expiry <= Utc::now()) {
        return Err(ApiError::Validation(
            "expiry_date must be in the future".to_string(),
        ));
    }

    let message = state
        .repo
        .create_message(NewMessage {
            sender_id: auth_user.id,
            receiver_id: receiver.id,
            subject: payload.subject,
            content: payload.content,
            message_type: payload.message_type,
            priority: payload.priority,
            parent_message_id: payload.parent_message_id,
            tags: payload.tags,
            expiry_date: payload.expiry_date,
        })
        .await?;

    tracing::info!(message_id = %message.id, sender_id = %message.sender_id, receiver_id = %message.receiver_id, "message sent");
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/messages/inbox",
    tag = "messages",
    security(("bearer" = [])),
    responses((status = 200, description = "Received messages, newest first", body = [Message]))
)]
pub async fn list_inbox(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.repo.list_inbox(auth_user.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/messages/sent",
    tag = "messages",
    security(("bearer" = [])),
    responses((status = 200, description = "Sent messages, newest first", body = [Message]))
)]
pub async fn list_sent(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.repo.list_sent(auth_user.id).await?))
}

/// get_message
///
/// [Authenticated Route] Opening an unread message as its receiver marks it read.
#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    tag = "messages",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = Message),
        (status = 404, description = "Unknown message or not a participant", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let message = load_visible(&state.repo, &auth_user, id).await?;

    if message.receiver_id == auth_user.id && message.read_at.is_none() {
        let read = state
            .repo
            .mark_message_read(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("message not found".to_string()))?;
        return Ok(Json(read));
    }
    Ok(Json(message))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}/replies",
    tag = "messages",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Parent message id")),
    responses(
        (status = 200, description = "Replies the requester takes part in, oldest first", body = [Message]),
        (status = 404, description = "Unknown message or not a participant", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_replies(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    load_visible(&state.repo, &auth_user, id).await?;
    Ok(Json(state.repo.list_replies(id, auth_user.id).await?))
}

/// delete_message
///
/// [Authenticated Route] Soft delete: the row is kept but disappears for both participants.
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    tag = "messages",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown message or not a participant", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    load_visible(&state.repo, &auth_user, id).await?;
    if state.repo.soft_delete_message(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("message not found".to_string()))
    }
}
