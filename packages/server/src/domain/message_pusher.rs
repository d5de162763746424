//! メッセージ送信（通知）のインターフェース
//!
//! ## 概要
//!
//! UseCase 層はこの trait を通してクライアントへイベントを送信します。
//! 送信対象は「このプロセスが保持している接続」に限られます。
//! 共有状態（誰がどこに接続しているか）は Repository が管理し、
//! MessagePusher は実際の送信経路だけを管理します。
//!
//! ## ルームチャンネル
//!
//! 配信ごとのチャンネルに接続を登録しておくと、`publish_to_room` で
//! そのチャンネルに参加している全接続へ一斉送信できます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError, ServerEvent, StreamId};

/// クライアントへ送信するためのチャンネル（エンコード済み JSON）
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録
    async fn register_client(
        &self,
        connection_id: ConnectionId,
        sender: PusherChannel,
        authenticated: bool,
    );

    /// 接続の登録を解除（参加中のルームチャンネルからも外れる）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続に送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError>;

    /// 全接続に送信し、送信できた件数を返す
    async fn push_to_all(&self, event: &ServerEvent) -> usize;

    /// 認証済みの接続にだけ送信し、送信できた件数を返す
    async fn push_to_authenticated(&self, event: &ServerEvent) -> usize;

    /// 配信ルームのチャンネルに参加
    async fn join_room(&self, stream_id: StreamId, connection_id: &ConnectionId);

    /// 配信ルームのチャンネルから退出
    async fn leave_room(&self, stream_id: StreamId, connection_id: &ConnectionId);

    /// 配信ルームのチャンネルに一斉送信し、送信できた件数を返す
    async fn publish_to_room(&self, stream_id: StreamId, event: &ServerEvent) -> usize;
}
