//! Static event dispatch table.
//!
//! Maps each decoded [`InboundEvent`] to its usecase and turns the outcome into
//! the reply for the calling connection. Broadcasts are issued by the usecases
//! themselves; the value returned here is only the direct reply.

use crate::{
    domain::{
        ChatDeleteScope, ChatQueryScope, ConnectionId, Failure, ServerEvent, StreamId, Timestamp,
        UserId,
    },
    infrastructure::dto::websocket::{InboundError, InboundEvent},
    usecase::NotificationRequest,
};

use super::state::AppState;

const STREAM_END_ACK: &str = "Stream ended";

/// Who sent the event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub connection_id: ConnectionId,
    /// 認証済みユーザー（匿名・未登録の接続なら None）
    pub user: Option<UserId>,
}

impl HandlerContext {
    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Runs the handler for one inbound event and returns the direct reply, if any.
pub async fn dispatch(
    state: &AppState,
    ctx: &HandlerContext,
    event: InboundEvent,
) -> Option<ServerEvent> {
    match event {
        InboundEvent::Ping => Some(ServerEvent::Pong {
            authenticated: ctx.authenticated(),
            at: Timestamp::now(),
        }),
        InboundEvent::JoinStream { stream_id, user_id } => {
            match state
                .join_stream_usecase
                .execute(&ctx.connection_id, stream_id, user_id)
                .await
            {
                // 新規参加はルームへのブロードキャストで本人にも届く
                Ok(outcome) if outcome.newly_joined => None,
                Ok(outcome) => Some(ServerEvent::ViewerCountUpdated {
                    stream_id,
                    count: outcome.count,
                }),
                Err(e) => Some(ServerEvent::StreamError(
                    stream_failure(e.status(), &e, stream_id).with_user(user_id),
                )),
            }
        }
        InboundEvent::LeaveStream { stream_id, user_id } => {
            match state
                .leave_stream_usecase
                .execute(Some(&ctx.connection_id), stream_id, user_id)
                .await
            {
                Ok(_) => Some(ServerEvent::LeftStream { stream_id }),
                Err(e) => Some(ServerEvent::StreamError(
                    stream_failure(e.status(), &e, stream_id).with_user(user_id),
                )),
            }
        }
        InboundEvent::StartStream { stream_id, details } => {
            match state
                .start_stream_usecase
                .execute(ctx.user, &ctx.connection_id, stream_id, details)
                .await
            {
                Ok(started) => Some(ServerEvent::StreamStartAccepted {
                    stream: started.stream,
                }),
                Err(e) => {
                    tracing::warn!("startStream {} rejected: {}", stream_id, e);
                    Some(ServerEvent::StreamError(stream_failure(e.status(), &e, stream_id)))
                }
            }
        }
        InboundEvent::EndStream { stream_id, .. } => {
            match state.end_stream_usecase.execute(ctx.user, stream_id).await {
                Ok(_) => Some(ServerEvent::StreamEnded {
                    stream_id,
                    message: STREAM_END_ACK.to_string(),
                }),
                Err(e) => {
                    tracing::warn!("endStream {} rejected: {}", stream_id, e);
                    Some(ServerEvent::StreamError(stream_failure(e.status(), &e, stream_id)))
                }
            }
        }
        InboundEvent::GetStreamRoomInfo(stream_id) => {
            match state.get_stream_room_info_usecase.execute(stream_id).await {
                Ok(lookup) => Some(ServerEvent::StreamRoomInfo(lookup)),
                Err(e) => Some(ServerEvent::StreamError(stream_failure(e.status(), &e, stream_id))),
            }
        }
        InboundEvent::GetViewerCount(stream_id) => {
            match state
                .get_stream_room_info_usecase
                .viewer_count(stream_id)
                .await
            {
                Ok(count) => Some(ServerEvent::ViewerCountUpdated { stream_id, count }),
                Err(e) => Some(ServerEvent::StreamError(stream_failure(e.status(), &e, stream_id))),
            }
        }
        InboundEvent::SendChatMessage(message) => {
            let (stream_id, user_id) = (message.stream_id, message.user_id);
            match state.send_chat_message_usecase.execute(message).await {
                Ok(_) => None,
                Err(e) => Some(ServerEvent::ChatMessageError(
                    Failure::new(e.status(), e.to_string())
                        .with_stream(stream_id)
                        .with_user(user_id),
                )),
            }
        }
        InboundEvent::GetStreamChatMessages(stream_id) => {
            chat_query(state, ChatQueryScope::Stream(stream_id)).await
        }
        InboundEvent::GetUserChatMessages(user_id) => {
            chat_query(state, ChatQueryScope::User(user_id)).await
        }
        InboundEvent::GetStreamUserChatMessages { stream_id, user_id } => {
            chat_query(state, ChatQueryScope::StreamAndUser(stream_id, user_id)).await
        }
        InboundEvent::DeleteChatMessage(message_id) => {
            chat_delete(state, ChatDeleteScope::Message(message_id)).await
        }
        InboundEvent::DeleteStreamChatMessages(stream_id) => {
            chat_delete(state, ChatDeleteScope::Stream(stream_id)).await
        }
        InboundEvent::DeleteUserChatMessages(user_id) => {
            chat_delete(state, ChatDeleteScope::User(user_id)).await
        }
        InboundEvent::SendNotification {
            sender_id,
            type_id,
            message,
            related_id,
        } => {
            let request = NotificationRequest {
                sender_id,
                type_id,
                message,
                related_id,
            };
            match state
                .send_notification_usecase
                .execute(ctx.user, request)
                .await
            {
                Ok(report) => {
                    for (user_id, e) in &report.failures {
                        tracing::warn!("Notification for user {} was not stored: {}", user_id, e);
                    }
                    None
                }
                Err(e) => {
                    tracing::warn!("sendNotification from {} rejected: {}", sender_id, e);
                    Some(ServerEvent::NotificationError(
                        Failure::new(e.status(), e.to_string()).with_user(sender_id),
                    ))
                }
            }
        }
    }
}

/// Builds the error reply for an envelope that could not be decoded.
///
/// The reply uses the error event of the family the client addressed.
pub fn rejection(error: &InboundError) -> ServerEvent {
    let failure = Failure::new(400, error.to_string());
    match error.event() {
        Some(event) if event.contains("Chat") => ServerEvent::ChatMessageError(failure),
        Some("sendNotification") => ServerEvent::NotificationError(failure),
        Some(
            "joinStream" | "leaveStream" | "startStream" | "endStream" | "getStreamRoomInfo"
            | "getViewerCount",
        ) => ServerEvent::StreamError(failure),
        _ => ServerEvent::Error(failure),
    }
}

fn stream_failure(status: u16, error: &impl ToString, stream_id: StreamId) -> Failure {
    Failure::new(status, error.to_string()).with_stream(stream_id)
}

async fn chat_query(state: &AppState, scope: ChatQueryScope) -> Option<ServerEvent> {
    match state.get_chat_messages_usecase.execute(scope).await {
        Ok(messages) => Some(ServerEvent::ChatMessages {
            scope,
            messages,
            at: Timestamp::now(),
        }),
        Err(e) => {
            let failure = Failure::new(e.status(), e.to_string());
            let failure = match scope {
                ChatQueryScope::Stream(stream_id) => failure.with_stream(stream_id),
                ChatQueryScope::User(user_id) => failure.with_user(user_id),
                ChatQueryScope::StreamAndUser(stream_id, user_id) => {
                    failure.with_stream(stream_id).with_user(user_id)
                }
            };
            Some(ServerEvent::ChatMessageError(failure))
        }
    }
}

async fn chat_delete(state: &AppState, scope: ChatDeleteScope) -> Option<ServerEvent> {
    match state.delete_chat_messages_usecase.execute(scope).await {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Chat delete ({:?}) failed: {}", scope, e);
            let failure = Failure::new(e.status(), e.to_string());
            let failure = match scope {
                ChatDeleteScope::Message(message_id) => failure.with_message_id(message_id),
                ChatDeleteScope::Stream(stream_id) => failure.with_stream(stream_id),
                ChatDeleteScope::User(user_id) => failure.with_user(user_id),
            };
            Some(ServerEvent::ChatMessageError(failure))
        }
    }
}
