//! UseCase: チャットメッセージの取得

use std::sync::Arc;

use crate::domain::{ChatMessage, ChatMessageRepository, ChatQueryScope};

use super::error::ChatError;

/// チャットメッセージ取得のユースケース
pub struct GetChatMessagesUseCase {
    chat_messages: Arc<dyn ChatMessageRepository>,
}

impl GetChatMessagesUseCase {
    pub fn new(chat_messages: Arc<dyn ChatMessageRepository>) -> Self {
        Self { chat_messages }
    }

    pub async fn execute(&self, scope: ChatQueryScope) -> Result<Vec<ChatMessage>, ChatError> {
        let messages = match scope {
            ChatQueryScope::Stream(stream_id) => {
                self.chat_messages.find_by_stream_id(stream_id).await?
            }
            ChatQueryScope::User(user_id) => self.chat_messages.find_by_user_id(user_id).await?,
            ChatQueryScope::StreamAndUser(stream_id, user_id) => {
                self.chat_messages
                    .find_by_stream_and_user(stream_id, user_id)
                    .await?
            }
        };
        Ok(messages)
    }
}
