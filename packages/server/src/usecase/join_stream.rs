//! UseCase: 視聴開始処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinStreamUseCase::execute() メソッド
//! - 視聴者の追加と視聴者数のブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 配信中以外の配信には参加できず、状態も変わらないことを保証する
//! - 同じユーザーの再参加で視聴者が重複しないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：配信中の配信への参加
//! - 異常系：予定・終了済みの配信、存在しない配信
//! - エッジケース：同じユーザーの再参加、別の接続からの再参加

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, RoomRepository, ServerEvent, StreamId,
    StreamRepository, Timestamp, UserId, Viewer,
};

use super::error::PresenceError;

/// 参加結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// 参加後の視聴者数
    pub count: usize,
    /// 新たに視聴者として追加されたかどうか（再参加なら false）
    pub newly_joined: bool,
}

/// 視聴開始のユースケース
pub struct JoinStreamUseCase {
    streams: Arc<dyn StreamRepository>,
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl JoinStreamUseCase {
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

    /// 視聴開始を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 参加する接続
    /// * `stream_id` - 参加先の配信
    /// * `user_id` - 視聴者のユーザー ID
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 参加後の視聴者数
    /// * `Err(PresenceError)` - 配信が存在しない、配信中でない、共有ストアの障害
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        stream_id: StreamId,
        user_id: UserId,
    ) -> Result<JoinOutcome, PresenceError> {
        // 1. 配信中であることを確認（ここで失敗した場合は何も変更しない）
        let stream = self
            .streams
            .find_by_id(stream_id)
            .await?
            .ok_or(PresenceError::StreamNotFound(stream_id))?;
        if !stream.is_live() {
            tracing::warn!(
                "User {} tried to join stream {} with status '{}'",
                user_id,
                stream_id,
                stream.status
            );
            return Err(PresenceError::StreamNotLive(stream_id));
        }

        let now = Timestamp::now();

        // 2. ルームを用意し、切断時の掃除のために参加先を記録してから視聴者を追加
        if self.rooms.open(stream_id, now).await? {
            tracing::info!("Room for stream {} opened", stream_id);
        }
        self.connections.track_room(connection_id, stream_id).await?;
        let newly_joined = self
            .rooms
            .add_viewer(
                stream_id,
                &Viewer {
                    user_id,
                    connection_id: connection_id.clone(),
                    joined_at: now,
                },
            )
            .await?;

        // 3. ルームのチャンネルを購読
        self.message_pusher.join_room(stream_id, connection_id).await;

        let count = self.rooms.count_viewers(stream_id).await?;

        // 4. 新しい視聴者の場合のみ視聴者数をブロードキャスト
        if newly_joined {
            let delivered = self
                .message_pusher
                .publish_to_room(stream_id, &ServerEvent::ViewerCountUpdated { stream_id, count })
                .await;
            tracing::info!(
                "User {} joined stream {} ({} viewers, notified {} connections)",
                user_id,
                stream_id,
                count,
                delivered
            );
        } else {
            tracing::debug!("User {} is already watching stream {}", user_id, stream_id);
        }

        Ok(JoinOutcome {
            count,
            newly_joined,
        })
    }
}
