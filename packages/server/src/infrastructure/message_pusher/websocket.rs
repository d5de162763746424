//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - このプロセスが保持している接続の `UnboundedSender` を管理
//! - 配信ルームごとのチャンネル（接続の集合）を管理
//! - `ServerEvent` を wire 形式の JSON にエンコードして送信
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! ルームチャンネルはプロセスローカルです。視聴者の正本は共有 KV ストアにあります。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel, ServerEvent, StreamId},
    infrastructure::dto::websocket::OutboundEvent,
};

struct ClientEntry {
    sender: PusherChannel,
    authenticated: bool,
}

#[derive(Default)]
struct PusherState {
    /// 接続中のクライアント
    clients: HashMap<ConnectionId, ClientEntry>,
    /// 配信ルームのチャンネル
    rooms: HashMap<StreamId, HashSet<ConnectionId>>,
}

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    state: Mutex<PusherState>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// このプロセスに接続しているクライアント数
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }
}

fn encode(event: &ServerEvent) -> Result<String, MessagePushError> {
    OutboundEvent::from(event)
        .to_json()
        .map_err(|e| MessagePushError::Encode(e.to_string()))
}

/// 複数の接続へ送信し、送信できた件数を返す（一部の失敗は許容）
fn send_each<'a>(
    targets: impl Iterator<Item = (&'a ConnectionId, &'a ClientEntry)>,
    json: &str,
) -> usize {
    let mut delivered = 0;
    for (connection_id, client) in targets {
        match client.sender.send(json.to_string()) {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!(
                "Failed to push message to connection '{}': {}",
                connection_id,
                e
            ),
        }
    }
    delivered
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(
        &self,
        connection_id: ConnectionId,
        sender: PusherChannel,
        authenticated: bool,
    ) {
        let mut state = self.state.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        state.clients.insert(
            connection_id,
            ClientEntry {
                sender,
                authenticated,
            },
        );
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        state.clients.remove(connection_id);
        state.rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        let json = encode(event)?;
        let state = self.state.lock().await;
        let client = state
            .clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        client
            .sender
            .send(json)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn push_to_all(&self, event: &ServerEvent) -> usize {
        let json = match encode(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("{}", e);
                return 0;
            }
        };
        let state = self.state.lock().await;
        send_each(state.clients.iter(), &json)
    }

    async fn push_to_authenticated(&self, event: &ServerEvent) -> usize {
        let json = match encode(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("{}", e);
                return 0;
            }
        };
        let state = self.state.lock().await;
        send_each(
            state.clients.iter().filter(|(_, client)| client.authenticated),
            &json,
        )
    }

    async fn join_room(&self, stream_id: StreamId, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        if !state.clients.contains_key(connection_id) {
            tracing::warn!(
                "Connection '{}' is not registered, not joining room {}",
                connection_id,
                stream_id
            );
            return;
        }
        state
            .rooms
            .entry(stream_id)
            .or_default()
            .insert(connection_id.clone());
    }

    async fn leave_room(&self, stream_id: StreamId, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        if let Some(members) = state.rooms.get_mut(&stream_id) {
            members.remove(connection_id);
            if members.is_empty() {
                state.rooms.remove(&stream_id);
            }
        }
    }

    async fn publish_to_room(&self, stream_id: StreamId, event: &ServerEvent) -> usize {
        let json = match encode(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("{}", e);
                return 0;
            }
        };
        let state = self.state.lock().await;
        let Some(members) = state.rooms.get(&stream_id) else {
            return 0;
        };
        send_each(
            members
                .iter()
                .filter_map(|id| state.clients.get_key_value(id)),
            &json,
        )
    }
}
