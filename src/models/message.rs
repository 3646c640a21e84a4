use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{MessagePriority, MessageStatus, MessageType};

/// Message
///
/// A direct message between two users. Replies point at their parent through
/// `parent_message_id`. Deleted messages keep their row (`deleted_at` is set) and
/// disappear from every listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub subject: String,
    pub content: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub status: MessageStatus,
    #[ts(type = "string | null")]
    pub read_at: Option<DateTime<Utc>>,
    pub parent_message_id: Option<Uuid>,
    pub tags: Vec<String>,
    #[ts(type = "string | null")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub priority: MessagePriority,
    pub parent_message_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[ts(type = "string | null")]
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Repository input for a new message row.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub subject: String,
    pub content: String,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub parent_message_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}
