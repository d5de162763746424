//! InMemory Subscription Repository 実装（参照のみ）

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{RepositoryError, Subscription, SubscriptionRepository, UserId};

pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: RwLock::new(subscriptions),
        }
    }

    /// フォロー関係を追加（重複は無視）
    pub async fn insert(&self, subscription: Subscription) {
        let mut subscriptions = self.subscriptions.write().await;
        if !subscriptions.contains(&subscription) {
            subscriptions.push(subscription);
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_subscribed_to_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.subscribed_to_id == user_id)
            .copied()
            .collect())
    }
}
