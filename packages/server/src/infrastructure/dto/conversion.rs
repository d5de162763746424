//! Conversion logic between DTOs and domain types.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use streamhub_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatDeleteScope, ChatMessage, ChatQueryScope, Failure, MessageId, NewChatMessage,
    Notification, RoomInfo, RoomLookup, ServerEvent, Stream, StreamDetails, StreamId, UserId,
    ValueObjectError, Viewer,
};
use crate::infrastructure::dto::websocket::{
    ChatAuthorDto, ChatMessageCreatedPayload, ChatMessageDto, ChatMessagesDeletedPayload,
    ChatMessagesPayload, ConnectionPayload, Envelope, ErrorPayload, IdParam, InboundError,
    InboundEvent, LeftStreamPayload, NotificationPayload, OutboundEvent, PongPayload,
    RoomInfoDto, RoomInfoResponse, SendChatMessagePayload, SendNotificationPayload,
    StreamDto, StreamEndedPayload, StreamLifecyclePayload, StreamMembershipPayload,
    StreamStartedPayload, StreamUserPayload, ViewerCountPayload, ViewerDto,
};

// ========================================
// DTO → Domain
// ========================================

fn invalid(event: &str, reason: impl ToString) -> InboundError {
    InboundError::InvalidPayload {
        event: event.to_string(),
        reason: reason.to_string(),
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T, InboundError> {
    serde_json::from_value(data).map_err(|e| invalid(event, e))
}

fn id<T>(event: &str, raw: i64) -> Result<T, InboundError>
where
    T: TryFrom<i64, Error = ValueObjectError>,
{
    T::try_from(raw).map_err(|e| invalid(event, e))
}

fn id_param<T>(event: &str, data: serde_json::Value) -> Result<T, InboundError>
where
    T: TryFrom<i64, Error = ValueObjectError> + FromStr<Err = ValueObjectError>,
{
    match payload::<IdParam>(event, data)? {
        IdParam::Number(raw) => id(event, raw),
        IdParam::Text(raw) => raw.parse().map_err(|e| invalid(event, e)),
    }
}

fn non_empty(event: &str, field: &str, value: String) -> Result<String, InboundError> {
    if value.trim().is_empty() {
        return Err(invalid(event, format!("'{}' must not be empty", field)));
    }
    Ok(value)
}

impl From<StreamLifecyclePayload> for StreamDetails {
    fn from(dto: StreamLifecyclePayload) -> Self {
        Self {
            title: dto.title,
            description: dto.description,
            thumbnail_url: dto.thumbnail_url,
            stream_url: dto.stream_url,
        }
    }
}

impl InboundEvent {
    /// Decode a text frame into a validated inbound event
    pub fn parse(text: &str) -> Result<Self, InboundError> {
        let Envelope { event, data } =
            serde_json::from_str(text).map_err(|e| InboundError::Malformed(e.to_string()))?;
        let name = event.as_str();

        let decoded = match name {
            "ping" => Self::Ping,
            "joinStream" | "leaveStream" => {
                let p: StreamMembershipPayload = payload(name, data)?;
                let stream_id = id(name, p.stream_id)?;
                let user_id = id(name, p.user_id)?;
                if name == "joinStream" {
                    Self::JoinStream { stream_id, user_id }
                } else {
                    Self::LeaveStream { stream_id, user_id }
                }
            }
            "startStream" | "endStream" => {
                let p: StreamLifecyclePayload = payload(name, data)?;
                let stream_id = id(name, p.id)?;
                let details = StreamDetails::from(p);
                if name == "startStream" {
                    Self::StartStream { stream_id, details }
                } else {
                    Self::EndStream { stream_id, details }
                }
            }
            "getStreamRoomInfo" => Self::GetStreamRoomInfo(id_param(name, data)?),
            "getViewerCount" => Self::GetViewerCount(id_param(name, data)?),
            "sendChatMessage" => {
                let p: SendChatMessagePayload = payload(name, data)?;
                Self::SendChatMessage(NewChatMessage {
                    stream_id: id(name, p.stream_id)?,
                    user_id: id(name, p.user_id)?,
                    message_text: non_empty(name, "message_text", p.message_text)?,
                })
            }
            "getStreamChatMessages" => Self::GetStreamChatMessages(id_param(name, data)?),
            "getUserChatMessages" => Self::GetUserChatMessages(id_param(name, data)?),
            "getStreamUserChatMessages" => {
                let p: StreamUserPayload = payload(name, data)?;
                Self::GetStreamUserChatMessages {
                    stream_id: id(name, p.stream_id)?,
                    user_id: id(name, p.user_id)?,
                }
            }
            "deleteChatMessage" => Self::DeleteChatMessage(id_param::<MessageId>(name, data)?),
            "deleteStreamChatMessages" => Self::DeleteStreamChatMessages(id_param(name, data)?),
            "deleteUserChatMessages" => Self::DeleteUserChatMessages(id_param(name, data)?),
            "sendNotification" => {
                let p: SendNotificationPayload = payload(name, data)?;
                Self::SendNotification {
                    sender_id: id(name, p.sender_id)?,
                    type_id: p.type_id,
                    message: non_empty(name, "message", p.message)?,
                    related_id: p.related_id,
                }
            }
            _ => return Err(InboundError::UnknownEvent(name.to_string())),
        };
        Ok(decoded)
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Stream> for StreamDto {
    fn from(model: &Stream) -> Self {
        Self {
            stream_id: model.id.value(),
            user_id: model.user_id.value(),
            title: model.title.clone(),
            description: model.description.clone(),
            thumbnail_url: model.thumbnail_url.clone(),
            stream_url: model.stream_url.clone(),
            status: model.status.to_string(),
        }
    }
}

impl From<&Viewer> for ViewerDto {
    fn from(model: &Viewer) -> Self {
        Self {
            user_id: model.user_id.value(),
            connection_id: model.connection_id.as_str().to_string(),
            joined_at: timestamp_to_rfc3339(model.joined_at.value()),
        }
    }
}

impl From<&RoomInfo> for RoomInfoDto {
    fn from(model: &RoomInfo) -> Self {
        Self {
            stream_id: model.stream_id.value(),
            viewers: model.viewers.iter().map(ViewerDto::from).collect(),
            started_at: timestamp_to_rfc3339(model.started_at.value()),
            current_viewers: model.viewer_count(),
        }
    }
}

impl From<&Failure> for ErrorPayload {
    fn from(model: &Failure) -> Self {
        Self {
            message: model.message.clone(),
            status: model.status,
            stream_id: model.stream_id.map(|id| id.value()),
            user_id: model.user_id.map(|id| id.value()),
            message_id: model.message_id.map(|id| id.value()),
        }
    }
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            stream_id: model.stream_id.value(),
            user_id: model.user_id.value(),
            message_text: model.message_text.clone(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
            user: model.author.as_ref().map(|a| ChatAuthorDto {
                username: a.username.clone(),
                avatar: a.avatar.clone(),
            }),
        }
    }
}

impl From<&Notification> for NotificationPayload {
    fn from(model: &Notification) -> Self {
        Self {
            notification_id: model.id,
            user_id: model.user_id.value(),
            sender_id: model.sender_id.value(),
            type_id: model.type_id,
            related_id: model.related_id,
            message: model.message.clone(),
            is_read: model.is_read,
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

const SUCCESS: &str = "success";

fn chat_messages(
    stream_id: Option<StreamId>,
    user_id: Option<UserId>,
    messages: &[ChatMessage],
    at: i64,
) -> ChatMessagesPayload {
    ChatMessagesPayload {
        status: SUCCESS.to_string(),
        stream_id: stream_id.map(|id| id.value()),
        user_id: user_id.map(|id| id.value()),
        messages: messages.iter().map(ChatMessageDto::from).collect(),
        timestamp: timestamp_to_rfc3339(at),
    }
}

fn chat_deleted(scope: ChatDeleteScope, at: i64) -> ChatMessagesDeletedPayload {
    let mut payload = ChatMessagesDeletedPayload {
        status: SUCCESS.to_string(),
        message_id: None,
        stream_id: None,
        user_id: None,
        timestamp: timestamp_to_rfc3339(at),
    };
    match scope {
        ChatDeleteScope::Message(id) => payload.message_id = Some(id.value()),
        ChatDeleteScope::Stream(id) => payload.stream_id = Some(id.value()),
        ChatDeleteScope::User(id) => payload.user_id = Some(id.value()),
    }
    payload
}

impl From<&ServerEvent> for OutboundEvent {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::Connected {
                connection_id,
                authenticated,
            } => Self::Connection(ConnectionPayload {
                status: "connected".to_string(),
                message: "WebSocket connection established!".to_string(),
                client_id: connection_id.as_str().to_string(),
                authenticated: *authenticated,
            }),
            ServerEvent::Pong { authenticated, at } => Self::Pong(PongPayload {
                status: "ok".to_string(),
                message: "WebSocket is working!".to_string(),
                timestamp: timestamp_to_rfc3339(at.value()),
                authenticated: *authenticated,
            }),
            ServerEvent::ViewerCountUpdated { stream_id, count } => {
                Self::ViewerCountUpdated(ViewerCountPayload {
                    stream_id: stream_id.to_string(),
                    count: *count,
                })
            }
            ServerEvent::StreamStarted { stream } => {
                Self::StreamStarted(StreamStartedPayload::Announcement {
                    stream_id: stream.id.value(),
                    user_id: stream.user_id.value(),
                    title: stream.title.clone(),
                    stream_url: stream.stream_url.clone(),
                    description: stream.description.clone(),
                })
            }
            ServerEvent::StreamStartAccepted { stream } => {
                Self::StreamStarted(StreamStartedPayload::Accepted {
                    message: "Stream started".to_string(),
                    status: 200,
                    stream: StreamDto::from(stream),
                })
            }
            ServerEvent::StreamEnded { stream_id, message } => {
                Self::StreamEnded(StreamEndedPayload {
                    message: message.clone(),
                    status: 200,
                    stream_id: stream_id.value(),
                })
            }
            ServerEvent::StreamRoomInfo(RoomLookup::Found(room)) => {
                Self::StreamRoomInfo(RoomInfoResponse::Found {
                    status: 200,
                    data: RoomInfoDto::from(room),
                })
            }
            ServerEvent::StreamRoomInfo(RoomLookup::NotFound(stream_id)) => {
                Self::StreamRoomInfo(RoomInfoResponse::NotFound {
                    status: 404,
                    message: "Stream room not found".to_string(),
                    stream_id: stream_id.value(),
                })
            }
            ServerEvent::LeftStream { stream_id } => Self::LeftStream(LeftStreamPayload {
                message: "Successfully left the stream".to_string(),
                status: 200,
                stream_id: stream_id.value(),
            }),
            ServerEvent::StreamError(failure) => Self::StreamError(failure.into()),
            ServerEvent::ChatMessageCreated { message, at } => {
                Self::ChatMessageCreated(ChatMessageCreatedPayload {
                    status: SUCCESS.to_string(),
                    message: ChatMessageDto::from(message),
                    timestamp: timestamp_to_rfc3339(at.value()),
                })
            }
            ServerEvent::ChatMessages {
                scope,
                messages,
                at,
            } => match *scope {
                ChatQueryScope::Stream(stream_id) => Self::StreamChatMessagesResponse(
                    chat_messages(Some(stream_id), None, messages, at.value()),
                ),
                ChatQueryScope::User(user_id) => Self::UserChatMessagesResponse(chat_messages(
                    None,
                    Some(user_id),
                    messages,
                    at.value(),
                )),
                ChatQueryScope::StreamAndUser(stream_id, user_id) => {
                    Self::StreamUserChatMessagesResponse(chat_messages(
                        Some(stream_id),
                        Some(user_id),
                        messages,
                        at.value(),
                    ))
                }
            },
            ServerEvent::ChatMessagesDeleted { scope, at } => {
                let payload = chat_deleted(*scope, at.value());
                match scope {
                    ChatDeleteScope::Message(_) => Self::ChatMessageDeleted(payload),
                    ChatDeleteScope::Stream(_) => Self::StreamChatMessagesDeleted(payload),
                    ChatDeleteScope::User(_) => Self::UserChatMessagesDeleted(payload),
                }
            }
            ServerEvent::ChatMessageError(failure) => Self::ChatMessageError(failure.into()),
            ServerEvent::FollowerNotification(notification) => {
                Self::FollowerReciveNotification(notification.into())
            }
            ServerEvent::NotificationError(failure) => Self::NotificationError(failure.into()),
            ServerEvent::Error(failure) => Self::Error(failure.into()),
        }
    }
}

impl OutboundEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
