//! ユーザー単位の送信（emitToUser / emitToAll / emitToAuthenticated）
//!
//! 宛先ユーザーの接続は共有ストアの逆引き（UserIndex）で解決します。
//! 配信は at-most-once のベストエフォートです。接続していないユーザー宛ての
//! イベントはキューに積まず破棄します。

use std::sync::Arc;

use crate::domain::{ConnectionRepository, MessagePushError, MessagePusher, ServerEvent, UserId};

pub struct UserNotifier {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl UserNotifier {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
        }
    }

    /// ユーザーの有効な接続にイベントを送り、届けられたかどうかを返す
    pub async fn emit_to_user(&self, user_id: UserId, event: &ServerEvent) -> bool {
        let connection_id = match self.connections.find_connection_of(user_id).await {
            Ok(Some(connection_id)) => connection_id,
            Ok(None) => {
                tracing::debug!("User {} is offline, dropping event", user_id);
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to resolve connection of user {}: {}", user_id, e);
                return false;
            }
        };

        match self.message_pusher.push_to(&connection_id, event).await {
            Ok(()) => true,
            Err(MessagePushError::ClientNotFound(_)) => {
                // 別プロセスの接続、または切断処理中の接続
                tracing::debug!(
                    "Connection '{}' of user {} is not held by this process",
                    connection_id,
                    user_id
                );
                false
            }
            Err(e) => {
                tracing::warn!("Failed to emit to user {}: {}", user_id, e);
                false
            }
        }
    }

    pub async fn emit_to_all(&self, event: &ServerEvent) -> usize {
        self.message_pusher.push_to_all(event).await
    }

    pub async fn emit_to_authenticated(&self, event: &ServerEvent) -> usize {
        self.message_pusher.push_to_authenticated(event).await
    }
}
