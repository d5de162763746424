//! UseCase: 配信終了処理
//!
//! 終了した配信の視聴者は強制的に退出させません。各視聴者は退出か切断で
//! ルームから抜け、最後の視聴者が抜けた時点でルームが削除されます。

use std::sync::Arc;

use crate::domain::{
    MessagePusher, RoomRepository, ServerEvent, Stream, StreamId, StreamRepository, StreamStatus,
    UserId,
};

use super::error::StreamLifecycleError;

const STREAM_ENDED_MESSAGE: &str = "Stream has ended";

/// 配信終了の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedStream {
    pub stream: Stream,
    /// 視聴者がいなかったためルームを削除したかどうか
    pub room_removed: bool,
}

/// 配信終了のユースケース
pub struct EndStreamUseCase {
    streams: Arc<dyn StreamRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl EndStreamUseCase {
    pub fn new(
        streams: Arc<dyn StreamRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            streams,
            rooms,
            message_pusher,
        }
    }

    pub async fn execute(
        &self,
        actor: Option<UserId>,
        stream_id: StreamId,
    ) -> Result<EndedStream, StreamLifecycleError> {
        let actor = actor.ok_or(StreamLifecycleError::Unauthenticated)?;

        let stream = self
            .streams
            .find_by_id(stream_id)
            .await?
            .ok_or(StreamLifecycleError::StreamNotFound(stream_id))?;
        if !stream.is_owned_by(actor) {
            return Err(StreamLifecycleError::NotOwner {
                stream_id,
                user_id: actor,
            });
        }

        let stream = self
            .streams
            .update_status(stream_id, StreamStatus::Ended)
            .await?;

        let delivered = self
            .message_pusher
            .publish_to_room(
                stream_id,
                &ServerEvent::StreamEnded {
                    stream_id,
                    message: STREAM_ENDED_MESSAGE.to_string(),
                },
            )
            .await;
        tracing::info!(
            "Stream {} ended (notified {} connections)",
            stream_id,
            delivered
        );

        let room_removed = self.remove_empty_room(stream_id).await;

        Ok(EndedStream {
            stream,
            room_removed,
        })
    }

    /// 視聴者がいないルームを削除する（配信の終了自体は失敗させない）
    async fn remove_empty_room(&self, stream_id: StreamId) -> bool {
        let room = match self.rooms.find(stream_id).await {
            Ok(room) => room,
            Err(e) => {
                tracing::error!("Failed to load room of stream {}: {}", stream_id, e);
                return false;
            }
        };
        match room {
            Some(room) if room.viewers.is_empty() => match self.rooms.delete(stream_id).await {
                Ok(()) => {
                    tracing::info!("Room for stream {} removed", stream_id);
                    true
                }
                Err(e) => {
                    tracing::error!("Failed to remove room of stream {}: {}", stream_id, e);
                    false
                }
            },
            _ => false,
        }
    }
}
