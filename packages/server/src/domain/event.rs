//! クライアントへ送信するイベント（ドメイン表現）
//!
//! wire 形式への変換は Infrastructure 層の DTO が担当します。

use super::{
    ChatMessage, ConnectionId, MessageId, Notification, RoomInfo, Stream, StreamId, Timestamp,
    UserId,
};

/// 失敗をクライアントに伝えるための情報
///
/// リクエストと突き合わせられるよう、関連する ID を保持します。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Failure {
    pub message: String,
    pub status: u16,
    pub stream_id: Option<StreamId>,
    pub user_id: Option<UserId>,
    pub message_id: Option<MessageId>,
}

impl Failure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, stream_id: StreamId) -> Self {
        self.stream_id = Some(stream_id);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_message_id(mut self, message_id: MessageId) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// ルーム情報の問い合わせ結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomLookup {
    Found(RoomInfo),
    NotFound(StreamId),
}

/// チャット履歴の問い合わせ範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatQueryScope {
    Stream(StreamId),
    User(UserId),
    StreamAndUser(StreamId, UserId),
}

/// チャット削除の範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatDeleteScope {
    Message(MessageId),
    Stream(StreamId),
    User(UserId),
}

/// サーバーからクライアントへのイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// 接続確立の通知
    Connected {
        connection_id: ConnectionId,
        authenticated: bool,
    },
    Pong {
        authenticated: bool,
        at: Timestamp,
    },
    ViewerCountUpdated {
        stream_id: StreamId,
        count: usize,
    },
    /// フォロワーへの配信開始通知
    StreamStarted { stream: Stream },
    /// 配信者への配信開始の応答
    StreamStartAccepted { stream: Stream },
    StreamEnded {
        stream_id: StreamId,
        message: String,
    },
    StreamRoomInfo(RoomLookup),
    LeftStream { stream_id: StreamId },
    StreamError(Failure),
    ChatMessageCreated {
        message: ChatMessage,
        at: Timestamp,
    },
    ChatMessages {
        scope: ChatQueryScope,
        messages: Vec<ChatMessage>,
        at: Timestamp,
    },
    ChatMessagesDeleted {
        scope: ChatDeleteScope,
        at: Timestamp,
    },
    ChatMessageError(Failure),
    FollowerNotification(Notification),
    NotificationError(Failure),
    /// 不正なリクエストなど、特定の機能に属さないエラー
    Error(Failure),
}
