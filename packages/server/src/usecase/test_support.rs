//! ユースケースのテスト用の組み立て
//!
//! 共有ストアはインメモリ実装、配信先は実際の WebSocketMessagePusher を使い、
//! クライアントが受け取ったイベントを JSON のまま検証できるようにしています。

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ChatAuthor, Connection, ConnectionId, ConnectionRepository, MessagePusher, Stream,
        StreamId, StreamStatus, Subscription, Timestamp, UserId,
    },
    infrastructure::{
        kv::InMemoryKeyValueStore,
        message_pusher::WebSocketMessagePusher,
        repository::{
            InMemoryChatMessageRepository, InMemoryNotificationRepository,
            InMemoryStreamRepository, InMemorySubscriptionRepository, KvConnectionRepository,
            KvRoomRepository,
        },
    },
};

use super::{
    DeleteChatMessagesUseCase, DisconnectClientUseCase, EndStreamUseCase, GetChatMessagesUseCase,
    GetStreamRoomInfoUseCase, JoinStreamUseCase, LeaveStreamUseCase, RefreshPresenceUseCase,
    SendChatMessageUseCase, SendNotificationUseCase, StartStreamUseCase, UserNotifier,
};

const STATE_TTL: Duration = Duration::from_secs(60);

pub fn user(id: i64) -> UserId {
    UserId::new(id).unwrap()
}

pub fn stream(id: i64) -> StreamId {
    StreamId::new(id).unwrap()
}

/// テスト用のクライアント（配信されたイベントを受け取る側）
pub struct TestClient {
    pub connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// ここまでに届いたイベントをすべて取り出す
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    pub fn event_names(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|event| event["event"].as_str().unwrap().to_string())
            .collect()
    }

    /// 指定したイベントの data 部分だけを取り出す
    pub fn payloads_of(&mut self, name: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|event| event["event"] == name)
            .map(|event| event["data"].clone())
            .collect()
    }

    /// 届いた viewerCountUpdated の count を順に取り出す
    pub fn viewer_counts(&mut self) -> Vec<u64> {
        self.payloads_of("viewerCountUpdated")
            .into_iter()
            .map(|data| data["count"].as_u64().unwrap())
            .collect()
    }
}

pub struct TestWorld {
    pub store: Arc<InMemoryKeyValueStore>,
    pub connections: Arc<KvConnectionRepository>,
    pub rooms: Arc<KvRoomRepository>,
    pub streams: Arc<InMemoryStreamRepository>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
    pub notifications: Arc<InMemoryNotificationRepository>,
    pub chat_messages: Arc<InMemoryChatMessageRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
}

impl TestWorld {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let authors = HashMap::from([
            (
                user(1),
                ChatAuthor {
                    username: "alice".into(),
                    avatar: None,
                },
            ),
            (
                user(2),
                ChatAuthor {
                    username: "bob".into(),
                    avatar: Some("https://cdn.example.com/bob.png".into()),
                },
            ),
        ]);

        Self {
            connections: Arc::new(KvConnectionRepository::new(store.clone(), STATE_TTL)),
            rooms: Arc::new(KvRoomRepository::new(store.clone(), STATE_TTL)),
            store,
            streams: Arc::new(InMemoryStreamRepository::new(Vec::new())),
            subscriptions: Arc::new(InMemorySubscriptionRepository::new(Vec::new())),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            chat_messages: Arc::new(InMemoryChatMessageRepository::new(authors)),
            pusher: Arc::new(WebSocketMessagePusher::new()),
        }
    }

    pub async fn add_stream(&self, id: i64, owner: i64, status: StreamStatus) {
        self.streams
            .insert(Stream {
                id: stream(id),
                user_id: user(owner),
                title: format!("stream {}", id),
                description: None,
                thumbnail_url: None,
                stream_url: None,
                status,
            })
            .await;
    }

    pub async fn follow(&self, subscriber: i64, broadcaster: i64) {
        self.subscriptions
            .insert(Subscription {
                subscriber_id: user(subscriber),
                subscribed_to_id: user(broadcaster),
            })
            .await;
    }

    /// 接続を確立した状態のクライアントを作る（接続処理と同じ登録を行う）
    pub async fn connect(&self, name: &str, user_id: Option<i64>) -> TestClient {
        let connection_id = ConnectionId::new(name.to_string()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = match user_id {
            Some(id) => Connection::authenticated(connection_id.clone(), user(id), Timestamp::now()),
            None => Connection::anonymous(connection_id.clone(), Timestamp::now()),
        };

        self.pusher
            .register_client(connection_id.clone(), tx, connection.authenticated)
            .await;
        self.connections.save(&connection).await.unwrap();
        if let Some(id) = user_id {
            self.connections
                .bind_user(user(id), &connection_id)
                .await
                .unwrap();
        }

        TestClient { connection_id, rx }
    }

    pub fn notifier(&self) -> UserNotifier {
        UserNotifier::new(self.connections.clone(), self.pusher.clone())
    }

    pub fn join_stream(&self) -> JoinStreamUseCase {
        JoinStreamUseCase::new(
            self.streams.clone(),
            self.rooms.clone(),
            self.connections.clone(),
            self.pusher.clone(),
        )
    }

    pub fn leave_stream(&self) -> LeaveStreamUseCase {
        LeaveStreamUseCase::new(
            self.streams.clone(),
            self.rooms.clone(),
            self.connections.clone(),
            self.pusher.clone(),
        )
    }

    pub fn room_info(&self) -> GetStreamRoomInfoUseCase {
        GetStreamRoomInfoUseCase::new(self.rooms.clone())
    }

    pub fn disconnect_client(&self) -> DisconnectClientUseCase {
        DisconnectClientUseCase::new(
            self.connections.clone(),
            self.rooms.clone(),
            self.pusher.clone(),
            Arc::new(self.leave_stream()),
        )
    }

    pub fn refresh_presence(&self) -> RefreshPresenceUseCase {
        RefreshPresenceUseCase::new(self.connections.clone(), self.rooms.clone(), STATE_TTL)
    }

    pub fn start_stream(&self) -> StartStreamUseCase {
        StartStreamUseCase::new(
            self.streams.clone(),
            self.subscriptions.clone(),
            self.pusher.clone(),
            Arc::new(self.notifier()),
        )
    }

    pub fn end_stream(&self) -> EndStreamUseCase {
        EndStreamUseCase::new(self.streams.clone(), self.rooms.clone(), self.pusher.clone())
    }

    pub fn send_notification(&self) -> SendNotificationUseCase {
        SendNotificationUseCase::new(
            self.subscriptions.clone(),
            self.notifications.clone(),
            Arc::new(self.notifier()),
        )
    }

    pub fn send_chat_message(&self) -> SendChatMessageUseCase {
        SendChatMessageUseCase::new(self.chat_messages.clone(), self.pusher.clone())
    }

    pub fn get_chat_messages(&self) -> GetChatMessagesUseCase {
        GetChatMessagesUseCase::new(self.chat_messages.clone())
    }

    pub fn delete_chat_messages(&self) -> DeleteChatMessagesUseCase {
        DeleteChatMessagesUseCase::new(self.chat_messages.clone(), self.pusher.clone())
    }
}
