//! InMemory Notification Repository 実装（書き込みのみ）

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{NewNotification, Notification, NotificationRepository, RepositoryError, Timestamp};

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<Vec<Notification>>,
    next_id: AtomicI64,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの通知（作成順）
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.lock().await.clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let created = Notification {
            id,
            user_id: notification.user_id,
            sender_id: notification.sender_id,
            type_id: notification.type_id,
            related_id: notification.related_id,
            message: notification.message,
            is_read: notification.is_read,
            created_at: Timestamp::now(),
        };
        self.notifications.lock().await.push(created.clone());
        Ok(created)
    }
}
