//! UseCase: チャットメッセージ送信処理

use std::sync::Arc;

use crate::domain::{
    ChatMessage, ChatMessageRepository, MessagePusher, NewChatMessage, ServerEvent, Timestamp,
};

use super::error::ChatError;

/// チャットメッセージ送信のユースケース
pub struct SendChatMessageUseCase {
    chat_messages: Arc<dyn ChatMessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SendChatMessageUseCase {
    pub fn new(
        chat_messages: Arc<dyn ChatMessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            chat_messages,
            message_pusher,
        }
    }

    /// メッセージを保存し、配信のルームにブロードキャストする
    pub async fn execute(&self, message: NewChatMessage) -> Result<ChatMessage, ChatError> {
        let stream_id = message.stream_id;
        let message = self.chat_messages.create(message).await?;

        let delivered = self
            .message_pusher
            .publish_to_room(
                stream_id,
                &ServerEvent::ChatMessageCreated {
                    message: message.clone(),
                    at: Timestamp::now(),
                },
            )
            .await;
        tracing::debug!(
            "Chat message {} in stream {} delivered to {} connections",
            message.id,
            stream_id,
            delivered
        );

        Ok(message)
    }
}
