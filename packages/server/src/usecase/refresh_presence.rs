//! UseCase: 接続中のプレゼンス情報の延長
//!
//! 共有ストアのキーはすべて有効期限付きです。接続が開いている間は
//! `interval()` ごとにこのユースケースを呼び出し、接続レコード・逆引き・
//! 参加中のルームの期限を延ばします。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RefreshPresenceUseCase::execute() メソッド
//! - 有効期限を過ぎても、延長された接続にはイベントが届き、ルームも残ること
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加中の接続の延長
//! - エッジケース：延長しなかった接続は期限切れで届かなくなる
//! - 異常系：共有ストアの障害

use std::{sync::Arc, time::Duration};

use crate::domain::{Connection, ConnectionRepository, RoomRepository, StreamId};

/// 有効期限の何分の一ごとに延長するか
const REFRESH_DIVISOR: u32 = 3;
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// 延長処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub connection_refreshed: bool,
    /// 視聴者エントリまで延長したルーム
    pub rooms_refreshed: Vec<StreamId>,
}

/// プレゼンス延長のユースケース
pub struct RefreshPresenceUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    interval: Duration,
}

impl RefreshPresenceUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        state_ttl: Duration,
    ) -> Self {
        Self {
            connections,
            rooms,
            interval: (state_ttl / REFRESH_DIVISOR).max(MIN_REFRESH_INTERVAL),
        }
    }

    /// 延長を呼び出す間隔
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 延長を実行
    ///
    /// 共有ストアの障害はログに残すだけで、このメソッドは失敗しません。
    pub async fn execute(&self, connection: &Connection) -> RefreshOutcome {
        let connection_refreshed = match self.connections.refresh(connection).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to refresh connection '{}': {}", connection.id, e);
                false
            }
        };

        let joined = match self.connections.joined_rooms(&connection.id).await {
            Ok(joined) => joined,
            Err(e) => {
                tracing::error!(
                    "Failed to list rooms of connection '{}': {}",
                    connection.id,
                    e
                );
                return RefreshOutcome {
                    connection_refreshed,
                    rooms_refreshed: Vec::new(),
                };
            }
        };

        let mut rooms_refreshed = Vec::new();
        for stream_id in joined {
            let viewer = match self.rooms.find(stream_id).await {
                Ok(Some(room)) => room.viewer_on_connection(&connection.id).cloned(),
                Ok(None) => None,
                Err(e) => {
                    tracing::error!("Failed to load room of stream {}: {}", stream_id, e);
                    continue;
                }
            };
            // 別の接続に付け替えられた視聴者は、その接続が延長する
            let Some(viewer) = viewer else {
                continue;
            };

            match self.rooms.refresh(stream_id, viewer.user_id).await {
                Ok(()) => rooms_refreshed.push(stream_id),
                Err(e) => tracing::error!(
                    "Failed to refresh room of stream {}: {}",
                    stream_id,
                    e
                ),
            }
        }

        tracing::debug!(
            "Presence of '{}' refreshed ({} rooms)",
            connection.id,
            rooms_refreshed.len()
        );
        RefreshOutcome {
            connection_refreshed,
            rooms_refreshed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionId, MockConnectionRepository, RepositoryError, ServerEvent, StreamStatus,
            Timestamp,
        },
        usecase::test_support::{TestWorld, stream, user},
    };

    fn pong() -> ServerEvent {
        ServerEvent::Pong {
            authenticated: true,
            at: Timestamp::new(0),
        }
    }

    #[test]
    fn test_interval_is_a_third_of_ttl() {
        // テスト項目: 延長の間隔は有効期限の 1/3（下限 1 秒）
        // given (前提条件):
        let world = TestWorld::new();

        // when (操作):
        let regular = RefreshPresenceUseCase::new(
            world.connections.clone(),
            world.rooms.clone(),
            Duration::from_secs(60),
        );
        let tiny = RefreshPresenceUseCase::new(
            world.connections.clone(),
            world.rooms.clone(),
            Duration::from_secs(1),
        );

        // then (期待する結果):
        assert_eq!(regular.interval(), Duration::from_secs(20));
        assert_eq!(tiny.interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_connection_outlives_ttl() {
        // テスト項目: 延長した接続には有効期限を過ぎてもイベントが届き、参加中のルームも残る
        // given (前提条件):
        let world = TestWorld::new();
        world.add_stream(42, 100, StreamStatus::Live).await;
        let alice = world.connect("alice", Some(1)).await;
        let _bob = world.connect("bob", Some(2)).await;
        world
            .join_stream()
            .execute(&alice.connection_id, stream(42), user(1))
            .await
            .unwrap();
        let connection = world
            .connections
            .find(&alice.connection_id)
            .await
            .unwrap()
            .unwrap();

        // when (操作):
        tokio::time::advance(Duration::from_secs(40)).await;
        let outcome = world.refresh_presence().execute(&connection).await;
        tokio::time::advance(Duration::from_secs(40)).await;

        // then (期待する結果):
        assert!(outcome.connection_refreshed);
        assert_eq!(outcome.rooms_refreshed, vec![stream(42)]);
        assert!(world.notifier().emit_to_user(user(1), &pong()).await);
        assert!(!world.notifier().emit_to_user(user(2), &pong()).await);
        let room = world.rooms.find(stream(42)).await.unwrap().unwrap();
        assert!(room.contains_user(user(1)));
        assert_eq!(
            world.connections.joined_rooms(&alice.connection_id).await.unwrap(),
            vec![stream(42)]
        );
    }

    #[tokio::test]
    async fn test_rebound_viewer_is_left_to_new_connection() {
        // テスト項目: 別の接続に付け替えられた視聴者のルームは古い接続からは延長しない
        // given (前提条件):
        let world = TestWorld::new();
        world.add_stream(42, 100, StreamStatus::Live).await;
        let old = world.connect("tab-1", Some(1)).await;
        let new = world.connect("tab-2", Some(1)).await;
        for client in [&old, &new] {
            world
                .join_stream()
                .execute(&client.connection_id, stream(42), user(1))
                .await
                .unwrap();
        }
        let connection = world
            .connections
            .find(&old.connection_id)
            .await
            .unwrap()
            .unwrap();

        // when (操作):
        let outcome = world.refresh_presence().execute(&connection).await;

        // then (期待する結果):
        assert!(outcome.connection_refreshed);
        assert!(outcome.rooms_refreshed.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_during_store_outage() {
        // テスト項目: 共有ストアの障害時も延長処理は失敗せずに終わる
        // given (前提条件):
        let world = TestWorld::new();
        let mut connections = MockConnectionRepository::new();
        connections
            .expect_refresh()
            .returning(|_| Err(RepositoryError::StoreUnavailable("down".into())));
        connections
            .expect_joined_rooms()
            .returning(|_| Err(RepositoryError::StoreUnavailable("down".into())));
        let usecase = RefreshPresenceUseCase::new(
            Arc::new(connections),
            world.rooms.clone(),
            Duration::from_secs(60),
        );
        let connection = Connection::anonymous(
            ConnectionId::new("alice".to_string()).unwrap(),
            Timestamp::now(),
        );

        // when (操作):
        let outcome = usecase.execute(&connection).await;

        // then (期待する結果):
        assert_eq!(outcome, RefreshOutcome::default());
    }
}
