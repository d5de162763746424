//! エンティティ
//!
//! `Connection` と `RoomInfo` は共有 KV ストアに JSON として保存されるため、
//! serde でシリアライズ可能にしています。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{ConnectionId, MessageId, StreamId, Timestamp, UserId};

/// WebSocket 接続
///
/// 接続時に作成され、切断時に削除されます。認証されていない（匿名の）接続も存在します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: Option<UserId>,
    pub authenticated: bool,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn anonymous(id: ConnectionId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id: None,
            authenticated: false,
            connected_at,
        }
    }

    pub fn authenticated(id: ConnectionId, user_id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id: Some(user_id),
            authenticated: true,
            connected_at,
        }
    }

    /// 認証済みユーザーの ID（匿名接続なら None）
    pub fn authenticated_user(&self) -> Option<UserId> {
        if self.authenticated { self.user_id } else { None }
    }
}

/// ライブ配信の視聴者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub joined_at: Timestamp,
}

/// 配信ルームの状態
///
/// 視聴者は `user_id` で一意です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub stream_id: StreamId,
    pub viewers: Vec<Viewer>,
    pub started_at: Timestamp,
}

impl RoomInfo {
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.viewers.iter().any(|v| v.user_id == user_id)
    }

    /// 指定した接続で視聴している視聴者を取得
    pub fn viewer_on_connection(&self, connection_id: &ConnectionId) -> Option<&Viewer> {
        self.viewers
            .iter()
            .find(|v| &v.connection_id == connection_id)
    }
}

/// ライブ配信の状態
///
/// `scheduled -> live -> ended` の順に遷移します（遷移は Stream リポジトリが管理）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Scheduled,
    Live,
    Ended,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Ended => "ended",
        }
    }
}

impl FromStr for StreamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "ended" => Ok(Self::Ended),
            other => Err(format!("unknown stream status '{}'", other)),
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ライブ配信（外部エンティティ。ここでは参照と状態更新のみ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    /// 配信者
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    pub status: StreamStatus,
}

impl Stream {
    pub fn is_live(&self) -> bool {
        self.status == StreamStatus::Live
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// 配信開始・終了時に更新される配信情報
///
/// `None` の項目は既存の値を維持します。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub stream_url: Option<String>,
}

/// フォロー関係（subscriber が subscribed_to をフォロー）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: UserId,
    pub subscribed_to_id: UserId,
}

/// 永続化前の通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub sender_id: UserId,
    pub type_id: i64,
    pub related_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
}

/// 永続化済みの通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub sender_id: UserId,
    pub type_id: i64,
    pub related_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub stream_id: StreamId,
    pub user_id: UserId,
    pub message_text: String,
}

/// チャット投稿者の表示情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAuthor {
    pub username: String,
    pub avatar: Option<String>,
}

/// 永続化済みのチャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub stream_id: StreamId,
    pub user_id: UserId,
    pub message_text: String,
    pub created_at: Timestamp,
    pub author: Option<ChatAuthor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(user: i64, connection: &str) -> Viewer {
        Viewer {
            user_id: UserId::new(user).unwrap(),
            connection_id: ConnectionId::new(connection.to_string()).unwrap(),
            joined_at: Timestamp::new(1000),
        }
    }

    #[test]
    fn test_room_info_lookups() {
        // テスト項目: 視聴者数・ユーザー検索・接続検索が正しく動作する
        // given (前提条件):
        let room = RoomInfo {
            stream_id: StreamId::new(42).unwrap(),
            viewers: vec![viewer(1, "conn-a"), viewer(2, "conn-b")],
            started_at: Timestamp::new(0),
        };
        let conn_b = ConnectionId::new("conn-b".to_string()).unwrap();
        let conn_c = ConnectionId::new("conn-c".to_string()).unwrap();

        // when (操作):
        let count = room.viewer_count();
        let on_b = room.viewer_on_connection(&conn_b);
        let on_c = room.viewer_on_connection(&conn_c);

        // then (期待する結果):
        assert_eq!(count, 2);
        assert!(room.contains_user(UserId::new(1).unwrap()));
        assert!(!room.contains_user(UserId::new(3).unwrap()));
        assert_eq!(on_b.map(|v| v.user_id.value()), Some(2));
        assert!(on_c.is_none());
    }

    #[test]
    fn test_anonymous_connection_has_no_authenticated_user() {
        // テスト項目: 匿名接続は認証済みユーザーを持たない
        // given (前提条件):
        let id = ConnectionId::generate();

        // when (操作):
        let anonymous = Connection::anonymous(id.clone(), Timestamp::new(1));
        let authenticated = Connection::authenticated(id, UserId::new(5).unwrap(), Timestamp::new(1));

        // then (期待する結果):
        assert_eq!(anonymous.authenticated_user(), None);
        assert_eq!(authenticated.authenticated_user(), Some(UserId::new(5).unwrap()));
    }

    #[test]
    fn test_stream_status_round_trips_through_str() {
        // テスト項目: 配信状態の文字列表現が wire 形式と一致する
        // given (前提条件):
        let statuses = [StreamStatus::Scheduled, StreamStatus::Live, StreamStatus::Ended];

        // when (操作):
        let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        // then (期待する結果):
        assert_eq!(names, vec!["scheduled", "live", "ended"]);
        assert_eq!("live".parse::<StreamStatus>(), Ok(StreamStatus::Live));
        assert!("paused".parse::<StreamStatus>().is_err());
        assert_eq!(serde_json::to_string(&StreamStatus::Ended).unwrap(), "\"ended\"");
    }
}
