//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `ConnectionRepository` / `RoomRepository`: プロセス間で共有される状態。
//!   共有 KV ストア上に実装され、複数プロセスから同時に更新されます。
//! - それ以外: リレーショナルストア側の協調リポジトリ（CRUD は対象外）。

use async_trait::async_trait;

use super::{
    ChatMessage, Connection, ConnectionId, MessageId, NewChatMessage, NewNotification,
    Notification, RepositoryError, RoomInfo, Stream, StreamDetails, StreamId, StreamStatus,
    Subscription, Timestamp, UserId, Viewer,
};

/// Connection Repository trait
///
/// 接続レコードと、ユーザー → 接続の逆引きインデックスを管理します。
/// 1 ユーザーにつき有効な接続は 1 つ（後から接続した方が優先）です。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続レコードを保存
    async fn save(&self, connection: &Connection) -> Result<(), RepositoryError>;

    /// 接続レコードを取得
    async fn find(&self, connection_id: &ConnectionId)
    -> Result<Option<Connection>, RepositoryError>;

    /// 接続レコードと参加ルームのインデックスを削除
    async fn delete(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError>;

    /// ユーザー → 接続の逆引きを登録（既存の値は上書き）
    async fn bind_user(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
    ) -> Result<(), RepositoryError>;

    /// ユーザーの有効な接続を取得
    async fn find_connection_of(
        &self,
        user_id: UserId,
    ) -> Result<Option<ConnectionId>, RepositoryError>;

    /// 逆引きがまだこの接続を指している場合だけ削除し、削除したかどうかを返す
    async fn unbind_user(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
    ) -> Result<bool, RepositoryError>;

    /// 接続が参加した配信を記録
    async fn track_room(
        &self,
        connection_id: &ConnectionId,
        stream_id: StreamId,
    ) -> Result<(), RepositoryError>;

    /// 接続が参加した配信の記録を削除
    async fn untrack_room(
        &self,
        connection_id: &ConnectionId,
        stream_id: StreamId,
    ) -> Result<(), RepositoryError>;

    /// 接続が参加している配信の一覧
    async fn joined_rooms(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Vec<StreamId>, RepositoryError>;

    /// 接続レコード・参加ルームの記録・逆引きの有効期限を延長
    ///
    /// 期限切れで消えていたレコードは保存し直します。
    /// 逆引きが別の接続を指している場合はそのままにします。
    async fn refresh(&self, connection: &Connection) -> Result<(), RepositoryError>;
}

/// Room Repository trait
///
/// 視聴者の追加・削除はメンバー単位のアトミックな操作として実装し、
/// ルーム全体の読み込み → 書き戻しは行いません。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルーム情報（視聴者一覧を含む）を取得
    async fn find(&self, stream_id: StreamId) -> Result<Option<RoomInfo>, RepositoryError>;

    /// ルームが存在しなければ作成し、作成したかどうかを返す
    async fn open(&self, stream_id: StreamId, started_at: Timestamp)
    -> Result<bool, RepositoryError>;

    /// 視聴者を追加し、新規に追加されたかどうかを返す
    ///
    /// 既に同じユーザーがいる場合は件数を変えず、接続だけを付け替えます。
    async fn add_viewer(&self, stream_id: StreamId, viewer: &Viewer)
    -> Result<bool, RepositoryError>;

    /// 視聴者を削除し、視聴者集合から削除したかどうかを返す
    async fn remove_viewer(&self, stream_id: StreamId, user_id: UserId)
    -> Result<bool, RepositoryError>;

    async fn count_viewers(&self, stream_id: StreamId) -> Result<usize, RepositoryError>;

    /// ルームと視聴者エントリの有効期限を延長
    async fn refresh(&self, stream_id: StreamId, user_id: UserId) -> Result<(), RepositoryError>;

    /// ルームを削除
    async fn delete(&self, stream_id: StreamId) -> Result<(), RepositoryError>;
}

/// Stream Repository trait（参照と状態更新のみ）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamRepository: Send + Sync {
    async fn find_by_id(&self, stream_id: StreamId) -> Result<Option<Stream>, RepositoryError>;

    async fn update_status(
        &self,
        stream_id: StreamId,
        status: StreamStatus,
    ) -> Result<Stream, RepositoryError>;

    /// 配信情報を更新しつつ状態を遷移させる
    async fn start_stream(
        &self,
        stream_id: StreamId,
        details: StreamDetails,
        status: StreamStatus,
    ) -> Result<Stream, RepositoryError>;
}

/// Subscription Repository trait（参照のみ）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// 指定ユーザーをフォローしているフォロー関係の一覧
    async fn find_by_subscribed_to_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, RepositoryError>;
}

/// Notification Repository trait（書き込みのみ）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError>;
}

/// ChatMessage Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// メッセージを保存し、投稿者の表示情報を付与して返す
    async fn create(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError>;

    async fn find_by_id(&self, message_id: MessageId)
    -> Result<Option<ChatMessage>, RepositoryError>;

    async fn find_by_stream_id(&self, stream_id: StreamId)
    -> Result<Vec<ChatMessage>, RepositoryError>;

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError>;

    async fn find_by_stream_and_user(
        &self,
        stream_id: StreamId,
        user_id: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    async fn delete(&self, message_id: MessageId) -> Result<(), RepositoryError>;

    async fn delete_all_by_stream_id(&self, stream_id: StreamId) -> Result<(), RepositoryError>;

    async fn delete_all_by_user_id(&self, user_id: UserId) -> Result<(), RepositoryError>;
}
