//! InMemory ChatMessage Repository 実装
//!
//! 保存時に投稿者の表示情報（ユーザー名・アバター）を付与します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    ChatAuthor, ChatMessage, ChatMessageRepository, MessageId, NewChatMessage, RepositoryError,
    StreamId, Timestamp, UserId,
};

#[derive(Default)]
struct Messages {
    items: Vec<ChatMessage>,
    last_id: i64,
}

pub struct InMemoryChatMessageRepository {
    messages: Mutex<Messages>,
    authors: RwLock<HashMap<UserId, ChatAuthor>>,
}

impl InMemoryChatMessageRepository {
    pub fn new(authors: HashMap<UserId, ChatAuthor>) -> Self {
        Self {
            messages: Mutex::new(Messages::default()),
            authors: RwLock::new(authors),
        }
    }

    async fn filtered(&self, predicate: impl Fn(&ChatMessage) -> bool) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .await
            .items
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }
}

impl Default for InMemoryChatMessageRepository {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryChatMessageRepository {
    async fn create(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let author = self.authors.read().await.get(&message.user_id).cloned();
        let mut messages = self.messages.lock().await;
        messages.last_id += 1;
        let id = MessageId::new(messages.last_id)
            .map_err(|e| RepositoryError::Persistence(e.to_string()))?;
        let created = ChatMessage {
            id,
            stream_id: message.stream_id,
            user_id: message.user_id,
            message_text: message.message_text,
            created_at: Timestamp::now(),
            author,
        };
        messages.items.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, message_id: MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self.filtered(|m| m.id == message_id).await.into_iter().next())
    }

    async fn find_by_stream_id(&self, stream_id: StreamId) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self.filtered(|m| m.stream_id == stream_id).await)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self.filtered(|m| m.user_id == user_id).await)
    }

    async fn find_by_stream_and_user(
        &self,
        stream_id: StreamId,
        user_id: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self
            .filtered(|m| m.stream_id == stream_id && m.user_id == user_id)
            .await)
    }

    async fn delete(&self, message_id: MessageId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().await;
        let before = messages.items.len();
        messages.items.retain(|m| m.id != message_id);
        if messages.items.len() == before {
            return Err(RepositoryError::NotFound(format!("chat message {}", message_id)));
        }
        Ok(())
    }

    async fn delete_all_by_stream_id(&self, stream_id: StreamId) -> Result<(), RepositoryError> {
        self.messages
            .lock()
            .await
            .items
            .retain(|m| m.stream_id != stream_id);
        Ok(())
    }

    async fn delete_all_by_user_id(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.messages
            .lock()
            .await
            .items
            .retain(|m| m.user_id != user_id);
        Ok(())
    }
}
