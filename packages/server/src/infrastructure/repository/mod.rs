//! Repository の実装

pub mod inmemory;
pub mod kv;

pub use inmemory::{
    InMemoryChatMessageRepository, InMemoryNotificationRepository, InMemoryStreamRepository,
    InMemorySubscriptionRepository, SeedData,
};
pub use kv::{KvConnectionRepository, KvRoomRepository};
