//! UseCase: チャットメッセージの削除
//!
//! 削除に成功した場合のみ削除イベントを送ります。単一メッセージ・配信単位の
//! 削除は配信のルームへ、ユーザー単位の削除は全接続へ送ります。

use std::sync::Arc;

use crate::domain::{
    ChatDeleteScope, ChatMessageRepository, MessagePusher, ServerEvent, Timestamp,
};

use super::error::ChatError;

/// チャットメッセージ削除のユースケース
pub struct DeleteChatMessagesUseCase {
    chat_messages: Arc<dyn ChatMessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DeleteChatMessagesUseCase {
    pub fn new(
        chat_messages: Arc<dyn ChatMessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            chat_messages,
            message_pusher,
        }
    }

    /// 削除を実行し、削除イベントを受け取った接続数を返す
    pub async fn execute(&self, scope: ChatDeleteScope) -> Result<usize, ChatError> {
        let event = ServerEvent::ChatMessagesDeleted {
            scope,
            at: Timestamp::now(),
        };

        let delivered = match scope {
            ChatDeleteScope::Message(message_id) => {
                let message = self
                    .chat_messages
                    .find_by_id(message_id)
                    .await?
                    .ok_or(ChatError::MessageNotFound(message_id))?;
                self.chat_messages.delete(message_id).await?;
                self.message_pusher
                    .publish_to_room(message.stream_id, &event)
                    .await
            }
            ChatDeleteScope::Stream(stream_id) => {
                self.chat_messages.delete_all_by_stream_id(stream_id).await?;
                self.message_pusher.publish_to_room(stream_id, &event).await
            }
            ChatDeleteScope::User(user_id) => {
                self.chat_messages.delete_all_by_user_id(user_id).await?;
                self.message_pusher.push_to_all(&event).await
            }
        };

        tracing::info!("Deleted chat messages ({:?})", scope);
        Ok(delivered)
    }
}
