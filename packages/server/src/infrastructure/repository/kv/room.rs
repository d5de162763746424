//! KV ストア上の Room Repository 実装
//!
//! ルーム全体を 1 つの値として読み書きせず、視聴者ごとのキーと
//! メンバー集合に分けて保存します。
//!
//! | key | 型 | 内容 |
//! |-----|----|------|
//! | `stream:room:{streamId}` | string | `{streamId, startedAt}`（JSON） |
//! | `stream:viewers:{streamId}` | set | 視聴者のユーザー ID |
//! | `stream:viewer:{streamId}:{userId}` | string | Viewer（JSON） |
//!
//! 視聴者数は集合の要素数（`SCARD`）です。同時に join / leave されても
//! 集合操作はアトミックなので、更新が失われることはありません。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    domain::{RepositoryError, RoomInfo, RoomRepository, StreamId, Timestamp, UserId, Viewer},
    infrastructure::kv::KeyValueStore,
};

fn room_key(stream_id: StreamId) -> String {
    format!("stream:room:{}", stream_id)
}

fn viewers_key(stream_id: StreamId) -> String {
    format!("stream:viewers:{}", stream_id)
}

fn viewer_key(stream_id: StreamId, user_id: UserId) -> String {
    format!("stream:viewer:{}:{}", stream_id, user_id)
}

/// ルームのヘッダー（視聴者一覧は別キー）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomHeader {
    stream_id: StreamId,
    started_at: Timestamp,
}

/// KV ストアを使った Room Repository
pub struct KvRoomRepository {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl KvRoomRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let Some(json) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| RepositoryError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write_viewer(&self, stream_id: StreamId, viewer: &Viewer) -> Result<(), RepositoryError> {
        let key = viewer_key(stream_id, viewer.user_id);
        let json = serde_json::to_string(viewer).map_err(|e| RepositoryError::Corrupted {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &json, Some(self.ttl)).await?;
        Ok(())
    }

    async fn viewer_ids(&self, stream_id: StreamId) -> Result<Vec<UserId>, RepositoryError> {
        let members = self.store.set_members(&viewers_key(stream_id)).await?;
        Ok(members
            .iter()
            .filter_map(|raw| raw.parse::<UserId>().ok())
            .collect())
    }
}

#[async_trait]
impl RoomRepository for KvRoomRepository {
    async fn find(&self, stream_id: StreamId) -> Result<Option<RoomInfo>, RepositoryError> {
        let header = self.read_json::<RoomHeader>(&room_key(stream_id)).await?;
        let user_ids = self.viewer_ids(stream_id).await?;
        // 視聴者が残っていればヘッダーが無くてもルームとして扱う
        if header.is_none() && user_ids.is_empty() {
            return Ok(None);
        }

        let mut viewers = Vec::new();
        for user_id in user_ids {
            // 集合への追加とエントリの書き込みの間に読んだ場合はエントリがまだない
            if let Some(viewer) = self
                .read_json::<Viewer>(&viewer_key(stream_id, user_id))
                .await?
            {
                viewers.push(viewer);
            }
        }
        viewers.sort_by_key(|v| (v.joined_at, v.user_id));

        let (stream_id, started_at) = match header {
            Some(header) => (header.stream_id, header.started_at),
            None => {
                tracing::warn!("Room header of stream {} is missing", stream_id);
                let started_at = viewers
                    .first()
                    .map(|v| v.joined_at)
                    .unwrap_or_else(Timestamp::now);
                (stream_id, started_at)
            }
        };

        Ok(Some(RoomInfo {
            stream_id,
            viewers,
            started_at,
        }))
    }

    async fn open(&self, stream_id: StreamId, started_at: Timestamp) -> Result<bool, RepositoryError> {
        let key = room_key(stream_id);
        let header = RoomHeader {
            stream_id,
            started_at,
        };
        let json = serde_json::to_string(&header).map_err(|e| RepositoryError::Corrupted {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let created = self.store.set_if_absent(&key, &json, Some(self.ttl)).await?;
        if created {
            tracing::debug!("Room for stream {} opened", stream_id);
        }
        Ok(created)
    }

    async fn add_viewer(&self, stream_id: StreamId, viewer: &Viewer) -> Result<bool, RepositoryError> {
        let key = viewers_key(stream_id);
        let added = self
            .store
            .set_add(&key, &viewer.user_id.to_string())
            .await?;
        self.store.expire(&key, self.ttl).await?;
        self.store.expire(&room_key(stream_id), self.ttl).await?;

        if added {
            self.write_viewer(stream_id, viewer).await?;
            return Ok(true);
        }

        // 既存の視聴者: 参加時刻は維持し、接続だけを付け替える
        let existing = self
            .read_json::<Viewer>(&viewer_key(stream_id, viewer.user_id))
            .await?;
        match existing {
            Some(existing) if existing.connection_id == viewer.connection_id => {}
            Some(existing) => {
                let rebound = Viewer {
                    connection_id: viewer.connection_id.clone(),
                    ..existing
                };
                self.write_viewer(stream_id, &rebound).await?;
            }
            None => self.write_viewer(stream_id, viewer).await?,
        }
        Ok(false)
    }

    async fn remove_viewer(
        &self,
        stream_id: StreamId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let key = viewer_key(stream_id, user_id);
        // 集合から外す前に読んだエントリと同じ値のときだけ消す。
        // 間に再参加で書かれたエントリは残る
        let entry = self.store.get(&key).await?;
        let removed = self
            .store
            .set_remove(&viewers_key(stream_id), &user_id.to_string())
            .await?;
        if let Some(entry) = entry {
            self.store.delete_if_equals(&key, &entry).await?;
        }
        self.store.expire(&room_key(stream_id), self.ttl).await?;
        Ok(removed)
    }

    async fn count_viewers(&self, stream_id: StreamId) -> Result<usize, RepositoryError> {
        Ok(self.store.set_len(&viewers_key(stream_id)).await?)
    }

    async fn refresh(&self, stream_id: StreamId, user_id: UserId) -> Result<(), RepositoryError> {
        self.store.expire(&room_key(stream_id), self.ttl).await?;
        self.store.expire(&viewers_key(stream_id), self.ttl).await?;
        self.store
            .expire(&viewer_key(stream_id, user_id), self.ttl)
            .await?;
        Ok(())
    }

    async fn delete(&self, stream_id: StreamId) -> Result<(), RepositoryError> {
        for user_id in self.viewer_ids(stream_id).await? {
            self.store.delete(&viewer_key(stream_id, user_id)).await?;
        }
        self.store.delete(&viewers_key(stream_id)).await?;
        self.store.delete(&room_key(stream_id)).await?;
        tracing::debug!("Room for stream {} deleted", stream_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use tokio::sync::Mutex;

    use crate::{
        domain::ConnectionId,
        infrastructure::kv::{InMemoryKeyValueStore, StoreError},
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルームの作成・視聴者の追加削除・削除
    // - 同一ユーザーの重複参加が件数を増やさないこと（冪等性）
    // - 並行した参加で更新が失われないこと
    // - 退出の途中に再参加が割り込んでも視聴者エントリが失われないこと
    // - 有効期限の延長
    //
    // 【なぜこのテストが必要か】
    // - 視聴者数はプロセス間で共有されるため、読み込み → 書き戻しの競合で
    //   壊れないことを保証する必要がある
    // ========================================

    const TTL: Duration = Duration::from_secs(60);

    /// set_remove の直後に、割り込ませた処理を 1 度だけ実行するストア
    struct InterleavingStore {
        inner: Arc<InMemoryKeyValueStore>,
        after_set_remove: Mutex<Option<BoxFuture<'static, ()>>>,
    }

    #[async_trait]
    impl KeyValueStore for InterleavingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(key).await
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<bool, StoreError> {
            self.inner.set_if_absent(key, value, ttl).await
        }

        async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
            self.inner.delete_if_equals(key, expected).await
        }

        async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
            self.inner.set_add(key, member).await
        }

        async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
            let removed = self.inner.set_remove(key, member).await?;
            let interleaved = self.after_set_remove.lock().await.take();
            if let Some(interleaved) = interleaved {
                interleaved.await;
            }
            Ok(removed)
        }

        async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
            self.inner.set_members(key).await
        }

        async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
            self.inner.set_len(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
            self.inner.expire(key, ttl).await
        }
    }

    fn create_test_repository() -> (KvRoomRepository, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        (KvRoomRepository::new(store.clone(), TTL), store)
    }

    fn stream(id: i64) -> StreamId {
        StreamId::new(id).unwrap()
    }

    fn viewer(user: i64, connection: &str, joined_at: i64) -> Viewer {
        Viewer {
            user_id: UserId::new(user).unwrap(),
            connection_id: ConnectionId::new(connection.to_string()).unwrap(),
            joined_at: Timestamp::new(joined_at),
        }
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        // テスト項目: 既にあるルームを open しても開始時刻は変わらない
        // given (前提条件):
        let (repo, _store) = create_test_repository();

        // when (操作):
        let first = repo.open(stream(42), Timestamp::new(100)).await.unwrap();
        let second = repo.open(stream(42), Timestamp::new(200)).await.unwrap();
        let room = repo.find(stream(42)).await.unwrap().unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(room.started_at, Timestamp::new(100));
        assert!(room.viewers.is_empty());
    }

    #[tokio::test]
    async fn test_add_viewer_twice_does_not_duplicate() {
        // テスト項目: 同じユーザーの重複参加は視聴者を増やさない
        // given (前提条件):
        let (repo, _store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();

        // when (操作):
        let first = repo.add_viewer(stream(42), &viewer(1, "a", 10)).await.unwrap();
        let second = repo.add_viewer(stream(42), &viewer(1, "a", 20)).await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(repo.count_viewers(stream(42)).await.unwrap(), 1);
        let room = repo.find(stream(42)).await.unwrap().unwrap();
        assert_eq!(room.viewers, vec![viewer(1, "a", 10)]);
    }

    #[tokio::test]
    async fn test_rejoin_from_new_connection_rebinds_viewer() {
        // テスト項目: 別の接続から再参加すると接続だけが付け替わる
        // given (前提条件):
        let (repo, _store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(1, "old", 10)).await.unwrap();

        // when (操作):
        let added = repo.add_viewer(stream(42), &viewer(1, "new", 20)).await.unwrap();

        // then (期待する結果):
        assert!(!added);
        let room = repo.find(stream(42)).await.unwrap().unwrap();
        assert_eq!(room.viewers, vec![viewer(1, "new", 10)]);
    }

    #[tokio::test]
    async fn test_remove_viewer() {
        // テスト項目: 視聴者を削除すると件数が減り、エントリも消える
        // given (前提条件):
        let (repo, store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(1, "a", 10)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(2, "b", 11)).await.unwrap();

        // when (操作):
        let removed = repo.remove_viewer(stream(42), UserId::new(1).unwrap()).await.unwrap();
        let missing = repo.remove_viewer(stream(42), UserId::new(9).unwrap()).await.unwrap();

        // then (期待する結果):
        assert!(removed);
        assert!(!missing);
        assert_eq!(repo.count_viewers(stream(42)).await.unwrap(), 1);
        assert_eq!(store.get("stream:viewer:42:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_every_key() {
        // テスト項目: ルーム削除でヘッダー・集合・視聴者エントリがすべて消える
        // given (前提条件):
        let (repo, store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(2, "b", 11)).await.unwrap();

        // when (操作):
        repo.delete(stream(42)).await.unwrap();

        // then (期待する結果):
        assert_eq!(repo.find(stream(42)).await.unwrap(), None);
        assert_eq!(store.get("stream:room:42").await.unwrap(), None);
        assert_eq!(store.get("stream:viewer:42:2").await.unwrap(), None);
        assert_eq!(store.set_len("stream:viewers:42").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_joins_are_not_lost() {
        // テスト項目: 並行に参加しても全員が視聴者として残る（更新の喪失がない）
        // given (前提条件):
        let (repo, _store) = create_test_repository();
        let repo = Arc::new(repo);
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();

        // when (操作):
        let tasks: Vec<_> = (1..=50)
            .map(|user| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.add_viewer(stream(42), &viewer(user, &format!("c{}", user), user))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // then (期待する結果):
        assert_eq!(repo.count_viewers(stream(42)).await.unwrap(), 50);
        assert_eq!(repo.find(stream(42)).await.unwrap().unwrap().viewer_count(), 50);
    }

    #[tokio::test]
    async fn test_rejoin_during_leave_keeps_viewer_entry() {
        // テスト項目: 退出の途中（集合から外した直後）に同じユーザーが再参加しても、
        //             再参加した視聴者のエントリは消えない
        // given (前提条件):
        let inner = Arc::new(InMemoryKeyValueStore::new());
        let joiner = KvRoomRepository::new(inner.clone(), TTL);
        joiner.open(stream(42), Timestamp::new(0)).await.unwrap();
        joiner
            .add_viewer(stream(42), &viewer(1, "tab-1", 10))
            .await
            .unwrap();
        let rejoin: BoxFuture<'static, ()> = Box::pin(async move {
            let added = joiner
                .add_viewer(stream(42), &viewer(1, "tab-2", 20))
                .await
                .unwrap();
            assert!(added);
        });
        let leaver = KvRoomRepository::new(
            Arc::new(InterleavingStore {
                inner: inner.clone(),
                after_set_remove: Mutex::new(Some(rejoin)),
            }),
            TTL,
        );

        // when (操作):
        let removed = leaver
            .remove_viewer(stream(42), UserId::new(1).unwrap())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(removed);
        let repo = KvRoomRepository::new(inner, TTL);
        assert_eq!(repo.count_viewers(stream(42)).await.unwrap(), 1);
        let room = repo.find(stream(42)).await.unwrap().unwrap();
        assert_eq!(room.viewers, vec![viewer(1, "tab-2", 20)]);
    }

    #[tokio::test]
    async fn test_room_without_header_is_still_found() {
        // テスト項目: ヘッダーが消えていても視聴者が残っていればルームとして取得できる
        // given (前提条件):
        let (repo, store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(2, "b", 30)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(1, "a", 20)).await.unwrap();
        store.delete("stream:room:42").await.unwrap();

        // when (操作):
        let room = repo.find(stream(42)).await.unwrap();

        // then (期待する結果):
        let room = room.unwrap();
        assert_eq!(room.viewer_count(), 2);
        assert_eq!(room.started_at, Timestamp::new(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_joins_and_refresh_extend_room_lifetime() {
        // テスト項目: 参加と refresh でヘッダー・集合・視聴者エントリの期限が延びる
        // given (前提条件):
        let (repo, store) = create_test_repository();
        repo.open(stream(42), Timestamp::new(0)).await.unwrap();
        repo.add_viewer(stream(42), &viewer(1, "a", 10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;
        repo.add_viewer(stream(42), &viewer(2, "b", 20)).await.unwrap();

        // when (操作):
        repo.refresh(stream(42), UserId::new(1).unwrap()).await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;
        let room = repo.find(stream(42)).await.unwrap().unwrap();

        // then (期待する結果):
        assert!(store.get("stream:room:42").await.unwrap().is_some());
        assert_eq!(room.started_at, Timestamp::new(0));
        assert_eq!(room.viewers, vec![viewer(1, "a", 10), viewer(2, "b", 20)]);
    }
}
