//! UseCase: 視聴終了処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveStreamUseCase::execute() メソッド
//! - 視聴者の削除、視聴者数のブロードキャスト、空になったルームの後始末
//!
//! ### なぜこのテストが必要か
//! - 配信中のルームは視聴者が 0 人でも残り、終了済みのルームは消えることを保証する
//! - 参加と退出の組で視聴者数が元に戻ることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：配信中・終了済みの配信からの退出
//! - エッジケース：ルームが存在しない、参加していないユーザーの退出

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, RoomRepository, ServerEvent, StreamId,
    StreamRepository, UserId,
};

use super::error::PresenceError;

/// 退出結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaveOutcome {
    /// 視聴者が実際に削除されたかどうか
    pub removed: bool,
    /// 退出後の視聴者数（ルームが無かった場合は None）
    pub count: Option<usize>,
    /// 空になったルームを削除したかどうか
    pub room_deleted: bool,
}

/// 視聴終了のユースケース
pub struct LeaveStreamUseCase {
    streams: Arc<dyn StreamRepository>,
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveStreamUseCase {
    pub fn new(
        streams: Arc<dyn StreamRepository>,
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            streams,
            rooms,
            connections,
            message_pusher,
        }
    }

    /// 視聴終了を実行
    ///
    /// `connection_id` が与えられた場合は、その接続のルーム購読と参加記録も外します。
    /// 切断時の掃除からは接続を渡さずに呼び出します。
    pub async fn execute(
        &self,
        connection_id: Option<&ConnectionId>,
        stream_id: StreamId,
        user_id: UserId,
    ) -> Result<LeaveOutcome, PresenceError> {
        if let Some(connection_id) = connection_id {
            self.message_pusher.leave_room(stream_id, connection_id).await;
            if let Err(e) = self.connections.untrack_room(connection_id, stream_id).await {
                tracing::warn!(
                    "Failed to untrack stream {} for connection '{}': {}",
                    stream_id,
                    connection_id,
                    e
                );
            }
        }

        // 1. ルームが無ければ何もしない
        if self.rooms.find(stream_id).await?.is_none() {
            tracing::debug!("No room for stream {}, nothing to leave", stream_id);
            return Ok(LeaveOutcome::default());
        }

        // 2. 視聴者を削除して視聴者数をブロードキャスト
        let removed = self.rooms.remove_viewer(stream_id, user_id).await?;
        let count = self.rooms.count_viewers(stream_id).await?;
        self.message_pusher
            .publish_to_room(stream_id, &ServerEvent::ViewerCountUpdated { stream_id, count })
            .await;
        tracing::info!(
            "User {} left stream {} ({} viewers remaining)",
            user_id,
            stream_id,
            count
        );

        // 3. 空になったルームは配信中でなければ削除
        let mut room_deleted = false;
        if count == 0 {
            let live = self
                .streams
                .find_by_id(stream_id)
                .await?
                .is_some_and(|stream| stream.is_live());
            if !live {
                self.rooms.delete(stream_id).await?;
                room_deleted = true;
                tracing::info!("Room for stream {} removed", stream_id);
            }
        }

        Ok(LeaveOutcome {
            removed,
            count: Some(count),
            room_deleted,
        })
    }
}
