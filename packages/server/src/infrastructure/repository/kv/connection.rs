//! KV ストア上の Connection Repository 実装
//!
//! | key | 型 | 内容 |
//! |-----|----|------|
//! | `presence:conn:{connId}` | string | Connection（JSON） |
//! | `presence:conn:{connId}:rooms` | set | 接続が参加している配信 ID |
//! | `presence:user:{userId}:conn` | string | ユーザーの有効な接続 ID |

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{Connection, ConnectionId, ConnectionRepository, RepositoryError, StreamId, UserId},
    infrastructure::kv::KeyValueStore,
};

fn connection_key(connection_id: &ConnectionId) -> String {
    format!("presence:conn:{}", connection_id)
}

fn connection_rooms_key(connection_id: &ConnectionId) -> String {
    format!("presence:conn:{}:rooms", connection_id)
}

fn user_connection_key(user_id: UserId) -> String {
    format!("presence:user:{}:conn", user_id)
}

/// KV ストアを使った Connection Repository
pub struct KvConnectionRepository {
    store: Arc<dyn KeyValueStore>,
    /// すべてのキーに設定する有効期限
    ttl: Duration,
}

impl KvConnectionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

#[async_trait]
impl ConnectionRepository for KvConnectionRepository {
    async fn save(&self, connection: &Connection) -> Result<(), RepositoryError> {
        let key = connection_key(&connection.id);
        let json = serde_json::to_string(connection).map_err(|e| RepositoryError::Corrupted {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &json, Some(self.ttl)).await?;
        Ok(())
    }

    async fn find(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<Connection>, RepositoryError> {
        let key = connection_key(connection_id);
        let Some(json) = self.store.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| RepositoryError::Corrupted {
                key,
                reason: e.to_string(),
            })
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError> {
        self.store.delete(&connection_key(connection_id)).await?;
        self.store
            .delete(&connection_rooms_key(connection_id))
            .await?;
        Ok(())
    }

    async fn bind_user(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
    ) -> Result<(), RepositoryError> {
        self.store
            .set(
                &user_connection_key(user_id),
                connection_id.as_str(),
                Some(self.ttl),
            )
            .await?;
        Ok(())
    }

    async fn find_connection_of(
        &self,
        user_id: UserId,
    ) -> Result<Option<ConnectionId>, RepositoryError> {
        let key = user_connection_key(user_id);
        match self.store.get(&key).await? {
            None => Ok(None),
            Some(raw) => ConnectionId::new(raw)
                .map(Some)
                .map_err(|e| RepositoryError::Corrupted {
                    key,
                    reason: e.to_string(),
                }),
        }
    }

    async fn unbind_user(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
    ) -> Result<bool, RepositoryError> {
        // 新しいセッションが上書きしていれば削除しない
        let removed = self
            .store
            .delete_if_equals(&user_connection_key(user_id), connection_id.as_str())
            .await?;
        Ok(removed)
    }

    async fn track_room(
        &self,
        connection_id: &ConnectionId,
        stream_id: StreamId,
    ) -> Result<(), RepositoryError> {
        let key = connection_rooms_key(connection_id);
        self.store.set_add(&key, &stream_id.to_string()).await?;
        self.store.expire(&key, self.ttl).await?;
        Ok(())
    }

    async fn untrack_room(
        &self,
        connection_id: &ConnectionId,
        stream_id: StreamId,
    ) -> Result<(), RepositoryError> {
        self.store
            .set_remove(&connection_rooms_key(connection_id), &stream_id.to_string())
            .await?;
        Ok(())
    }

    async fn joined_rooms(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Vec<StreamId>, RepositoryError> {
        let members = self
            .store
            .set_members(&connection_rooms_key(connection_id))
            .await?;
        let mut rooms: Vec<StreamId> = members
            .iter()
            .filter_map(|raw| match raw.parse::<StreamId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed room '{}' of connection '{}': {}",
                        raw,
                        connection_id,
                        e
                    );
                    None
                }
            })
            .collect();
        rooms.sort();
        Ok(rooms)
    }

    async fn refresh(&self, connection: &Connection) -> Result<(), RepositoryError> {
        self.save(connection).await?;
        self.store
            .expire(&connection_rooms_key(&connection.id), self.ttl)
            .await?;

        if let Some(user_id) = connection.authenticated_user() {
            let key = user_connection_key(user_id);
            let id = connection.id.as_str();
            // 消えていれば登録し直し、別の接続を指していれば触らない
            if !self.store.set_if_absent(&key, id, Some(self.ttl)).await?
                && self.store.get(&key).await?.as_deref() == Some(id)
            {
                self.store.expire(&key, self.ttl).await?;
            }
        }
        Ok(())
    }
}
