//! UseCase: ルーム情報・視聴者数の取得

use std::sync::Arc;

use crate::domain::{RoomLookup, RoomRepository, StreamId};

use super::error::PresenceError;

/// ルーム情報取得のユースケース
pub struct GetStreamRoomInfoUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetStreamRoomInfoUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// ルーム情報を取得（ルームが無ければ NotFound を返す）
    pub async fn execute(&self, stream_id: StreamId) -> Result<RoomLookup, PresenceError> {
        Ok(match self.rooms.find(stream_id).await? {
            Some(room) => RoomLookup::Found(room),
            None => RoomLookup::NotFound(stream_id),
        })
    }

    /// 現在の視聴者数（ルームが無ければ 0）
    pub async fn viewer_count(&self, stream_id: StreamId) -> Result<usize, PresenceError> {
        Ok(self.rooms.count_viewers(stream_id).await?)
    }
}
