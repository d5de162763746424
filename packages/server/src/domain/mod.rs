//! ドメイン層
//!
//! 接続・視聴者・ライブ配信・通知・チャットのモデルと、
//! ドメインが必要とする外部とのインターフェース（trait）を定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod auth;
pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use auth::{AuthenticatedUser, TokenVerifier};
pub use entity::{
    ChatAuthor, ChatMessage, Connection, NewChatMessage, NewNotification, Notification, RoomInfo,
    Stream, StreamDetails, StreamStatus, Subscription, Viewer,
};
pub use error::{AuthError, MessagePushError, RepositoryError, ValueObjectError};
pub use event::{ChatDeleteScope, ChatQueryScope, Failure, RoomLookup, ServerEvent};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{
    ChatMessageRepository, ConnectionRepository, NotificationRepository, RoomRepository,
    StreamRepository, SubscriptionRepository,
};
pub use value_object::{ConnectionId, MessageId, StreamId, Timestamp, UserId};

#[cfg(test)]
pub use auth::MockTokenVerifier;
#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::{
    MockChatMessageRepository, MockConnectionRepository, MockNotificationRepository,
    MockRoomRepository, MockStreamRepository, MockSubscriptionRepository,
};
