//! WebSocket message DTOs.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": <payload>}`.
//! Inbound envelopes are decoded into the closed [`InboundEvent`] set before dispatch;
//! outbound events are serialized from [`OutboundEvent`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MessageId, NewChatMessage, StreamDetails, StreamId, UserId};

// ========================================
// Inbound (client → server)
// ========================================

/// Raw envelope, before the payload is interpreted
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// An id sent either as a JSON number or as a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdParam {
    Number(i64),
    Text(String),
}

/// `joinStream` / `leaveStream` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamMembershipPayload {
    pub stream_id: i64,
    pub user_id: i64,
}

/// `startStream` / `endStream` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamLifecyclePayload {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendChatMessagePayload {
    pub stream_id: i64,
    pub user_id: i64,
    pub message_text: String,
}

/// `getStreamUserChatMessages` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUserPayload {
    pub stream_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendNotificationPayload {
    pub sender_id: i64,
    pub type_id: i64,
    pub message: String,
    #[serde(default)]
    pub related_id: Option<i64>,
}

/// Decoded and validated inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Ping,
    JoinStream {
        stream_id: StreamId,
        user_id: UserId,
    },
    LeaveStream {
        stream_id: StreamId,
        user_id: UserId,
    },
    StartStream {
        stream_id: StreamId,
        details: StreamDetails,
    },
    EndStream {
        stream_id: StreamId,
        details: StreamDetails,
    },
    GetStreamRoomInfo(StreamId),
    GetViewerCount(StreamId),
    SendChatMessage(NewChatMessage),
    GetStreamChatMessages(StreamId),
    GetUserChatMessages(UserId),
    GetStreamUserChatMessages {
        stream_id: StreamId,
        user_id: UserId,
    },
    DeleteChatMessage(MessageId),
    DeleteStreamChatMessages(StreamId),
    DeleteUserChatMessages(UserId),
    SendNotification {
        sender_id: UserId,
        type_id: i64,
        message: String,
        related_id: Option<i64>,
    },
}

/// Errors while decoding an inbound envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InboundError {
    #[error("malformed message envelope: {0}")]
    Malformed(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },
}

impl InboundError {
    /// The event name the client sent, if the envelope could be read
    pub fn event(&self) -> Option<&str> {
        match self {
            Self::Malformed(_) => None,
            Self::UnknownEvent(event) | Self::InvalidPayload { event, .. } => Some(event),
        }
    }
}

// ========================================
// Outbound (server → client)
// ========================================

/// Outbound event envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    Connection(ConnectionPayload),
    Pong(PongPayload),
    ViewerCountUpdated(ViewerCountPayload),
    StreamStarted(StreamStartedPayload),
    StreamEnded(StreamEndedPayload),
    StreamRoomInfo(RoomInfoResponse),
    LeftStream(LeftStreamPayload),
    StreamError(ErrorPayload),
    ChatMessageCreated(ChatMessageCreatedPayload),
    StreamChatMessagesResponse(ChatMessagesPayload),
    UserChatMessagesResponse(ChatMessagesPayload),
    StreamUserChatMessagesResponse(ChatMessagesPayload),
    ChatMessageDeleted(ChatMessagesDeletedPayload),
    StreamChatMessagesDeleted(ChatMessagesDeletedPayload),
    UserChatMessagesDeleted(ChatMessagesDeletedPayload),
    ChatMessageError(ErrorPayload),
    FollowerReciveNotification(NotificationPayload),
    NotificationError(ErrorPayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    pub status: String,
    pub message: String,
    pub client_id: String,
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCountPayload {
    /// Stream id as a string
    pub stream_id: String,
    pub count: usize,
}

/// Stream as exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDto {
    pub stream_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub stream_url: Option<String>,
    pub status: String,
}

/// `streamStarted` has two shapes: the acknowledgement to the broadcaster
/// and the announcement to followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamStartedPayload {
    Accepted {
        message: String,
        status: u16,
        stream: StreamDto,
    },
    #[serde(rename_all = "camelCase")]
    Announcement {
        stream_id: i64,
        user_id: i64,
        title: String,
        stream_url: Option<String>,
        description: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEndedPayload {
    pub message: String,
    pub status: u16,
    pub stream_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerDto {
    pub user_id: i64,
    pub connection_id: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoDto {
    pub stream_id: i64,
    pub viewers: Vec<ViewerDto>,
    pub started_at: String,
    pub current_viewers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoomInfoResponse {
    Found { status: u16, data: RoomInfoDto },
    #[serde(rename_all = "camelCase")]
    NotFound {
        status: u16,
        message: String,
        stream_id: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftStreamPayload {
    pub message: String,
    pub status: u16,
    pub stream_id: i64,
}

/// Error payload shared by `streamError`, `chatMessageError`, `notificationError` and `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAuthorDto {
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessageDto {
    pub id: i64,
    pub stream_id: i64,
    pub user_id: i64,
    pub message_text: String,
    pub created_at: String,
    pub user: Option<ChatAuthorDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessageCreatedPayload {
    pub status: String,
    pub message: ChatMessageDto,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesPayload {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub messages: Vec<ChatMessageDto>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesDeletedPayload {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub timestamp: String,
}

/// `followerReciveNotification` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub notification_id: i64,
    pub user_id: i64,
    pub sender_id: i64,
    pub type_id: i64,
    pub related_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}
