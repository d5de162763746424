//! UseCase 層
//!
//! 1 つの操作につき 1 つのユースケースを用意し、`execute` で実行します。
//! 共有ストア・協調リポジトリ・MessagePusher へは domain の trait 経由でアクセスします。

pub mod connect_client;
pub mod delete_chat_messages;
pub mod disconnect_client;
pub mod end_stream;
pub mod error;
pub mod get_chat_messages;
pub mod get_stream_room_info;
pub mod join_stream;
pub mod leave_stream;
pub mod notifier;
pub mod refresh_presence;
pub mod send_chat_message;
pub mod send_notification;
pub mod start_stream;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_client::{ConnectClientUseCase, ConnectedClient};
pub use delete_chat_messages::DeleteChatMessagesUseCase;
pub use disconnect_client::{DisconnectClientUseCase, DisconnectOutcome};
pub use end_stream::{EndStreamUseCase, EndedStream};
pub use error::{ChatError, NotificationError, PresenceError, StreamLifecycleError};
pub use get_chat_messages::GetChatMessagesUseCase;
pub use get_stream_room_info::GetStreamRoomInfoUseCase;
pub use join_stream::{JoinOutcome, JoinStreamUseCase};
pub use leave_stream::{LeaveOutcome, LeaveStreamUseCase};
pub use notifier::UserNotifier;
pub use refresh_presence::{RefreshOutcome, RefreshPresenceUseCase};
pub use send_chat_message::SendChatMessageUseCase;
pub use send_notification::{FanoutReport, NotificationRequest, SendNotificationUseCase};
pub use start_stream::{StartStreamUseCase, StartedStream};
