//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::execute() メソッド
//! - 参加中のルームからの退出（切断時の掃除）と接続情報の削除
//!
//! ### なぜこのテストが必要か
//! - 明示的な退出が無くても、切断した視聴者がルームに残らないことを保証する
//! - 同じユーザーの新しい接続の逆引きを消さないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数のルームに参加した状態での切断
//! - エッジケース：別の接続に付け替えられた視聴者、同じユーザーの新しい接続
//! - 異常系：共有ストアの障害

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, RoomRepository, StreamId,
};

use super::leave_stream::LeaveStreamUseCase;

/// 切断処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// 掃除で退出したルーム
    pub rooms_left: Vec<StreamId>,
}

/// 切断のユースケース
pub struct DisconnectClientUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    leave_stream: Arc<LeaveStreamUseCase>,
}

impl DisconnectClientUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        leave_stream: Arc<LeaveStreamUseCase>,
    ) -> Self {
        Self {
            connections,
            rooms,
            message_pusher,
            leave_stream,
        }
    }

    /// 切断を実行
    ///
    /// 共有ストアの障害はログに残すだけで、このメソッドは失敗しません。
    pub async fn execute(&self, connection_id: &ConnectionId) -> DisconnectOutcome {
        // 1. このプロセスの送信先から外す（全ルームの購読も外れる）
        self.message_pusher.unregister_client(connection_id).await;

        let connection = match self.connections.find(connection_id).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!("Failed to load connection '{}': {}", connection_id, e);
                None
            }
        };

        // 2. 参加中のルームから退出
        let rooms_left = self.sweep_rooms(connection_id).await;

        // 3. 接続情報と逆引きを削除
        if let Err(e) = self.connections.delete(connection_id).await {
            tracing::error!("Failed to delete connection '{}': {}", connection_id, e);
        }
        if let Some(user_id) = connection.and_then(|c| c.authenticated_user()) {
            match self.connections.unbind_user(user_id, connection_id).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(
                    "User {} already has a newer connection, keeping its index",
                    user_id
                ),
                Err(e) => tracing::error!("Failed to unbind user {}: {}", user_id, e),
            }
        }

        tracing::info!(
            "Connection '{}' disconnected (left {} rooms)",
            connection_id,
            rooms_left.len()
        );
        DisconnectOutcome { rooms_left }
    }

    async fn sweep_rooms(&self, connection_id: &ConnectionId) -> Vec<StreamId> {
        let joined = match self.connections.joined_rooms(connection_id).await {
            Ok(joined) => joined,
            Err(e) => {
                tracing::error!(
                    "Failed to list rooms of connection '{}': {}",
                    connection_id,
                    e
                );
                return Vec::new();
            }
        };

        let mut rooms_left = Vec::new();
        for stream_id in joined {
            let viewer = match self.rooms.find(stream_id).await {
                Ok(Some(room)) => room.viewer_on_connection(connection_id).cloned(),
                Ok(None) => None,
                Err(e) => {
                    tracing::error!("Failed to load room of stream {}: {}", stream_id, e);
                    continue;
                }
            };
            // 別の接続に付け替えられた視聴者はそのまま残す
            let Some(viewer) = viewer else {
                continue;
            };

            match self
                .leave_stream
                .execute(None, stream_id, viewer.user_id)
                .await
            {
                Ok(_) => rooms_left.push(stream_id),
                Err(e) => tracing::error!(
                    "Failed to retire user {} from stream {}: {}",
                    viewer.user_id,
                    stream_id,
                    e
                ),
            }
        }
        rooms_left
    }
}
