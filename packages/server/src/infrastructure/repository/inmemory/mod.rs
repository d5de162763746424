//! インメモリの協調リポジトリ実装
//!
//! 配信・フォロー関係・通知・チャットはリレーショナルストア側の責務です。
//! このサーバーを単体で動かすため、同じ trait をインメモリで実装しています。

pub mod chat_message;
pub mod notification;
pub mod seed;
pub mod stream;
pub mod subscription;

pub use chat_message::InMemoryChatMessageRepository;
pub use notification::InMemoryNotificationRepository;
pub use seed::{SeedData, SeedError};
pub use stream::InMemoryStreamRepository;
pub use subscription::InMemorySubscriptionRepository;
