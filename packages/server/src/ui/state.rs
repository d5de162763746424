//! Server state shared by every handler.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{
        ChatMessageRepository, ConnectionRepository, MessagePusher, NotificationRepository,
        RoomRepository, StreamRepository, SubscriptionRepository, TokenVerifier,
    },
    usecase::{
        ConnectClientUseCase, DeleteChatMessagesUseCase, DisconnectClientUseCase,
        EndStreamUseCase, GetChatMessagesUseCase, GetStreamRoomInfoUseCase, JoinStreamUseCase,
        LeaveStreamUseCase, RefreshPresenceUseCase, SendChatMessageUseCase,
        SendNotificationUseCase, StartStreamUseCase, UserNotifier,
    },
};

/// ユースケースを組み立てるための依存（Repository / MessagePusher / TokenVerifier）
pub struct Collaborators {
    pub connections: Arc<dyn ConnectionRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub streams: Arc<dyn StreamRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub chat_messages: Arc<dyn ChatMessageRepository>,
    pub message_pusher: Arc<dyn MessagePusher>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    /// 共有ストアのキーの有効期限（接続中はこの期限より前に延長する）
    pub state_ttl: Duration,
}

/// Shared application state
pub struct AppState {
    /// ConnectClientUseCase（接続のユースケース）
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// DisconnectClientUseCase（切断のユースケース）
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    /// RefreshPresenceUseCase（接続中のプレゼンス延長のユースケース）
    pub refresh_presence_usecase: Arc<RefreshPresenceUseCase>,
    /// JoinStreamUseCase（視聴開始のユースケース）
    pub join_stream_usecase: Arc<JoinStreamUseCase>,
    /// LeaveStreamUseCase（視聴終了のユースケース）
    pub leave_stream_usecase: Arc<LeaveStreamUseCase>,
    /// GetStreamRoomInfoUseCase（ルーム情報取得のユースケース）
    pub get_stream_room_info_usecase: Arc<GetStreamRoomInfoUseCase>,
    /// StartStreamUseCase（配信開始のユースケース）
    pub start_stream_usecase: Arc<StartStreamUseCase>,
    /// EndStreamUseCase（配信終了のユースケース）
    pub end_stream_usecase: Arc<EndStreamUseCase>,
    /// SendNotificationUseCase（通知一斉送信のユースケース）
    pub send_notification_usecase: Arc<SendNotificationUseCase>,
    /// SendChatMessageUseCase（チャット送信のユースケース）
    pub send_chat_message_usecase: Arc<SendChatMessageUseCase>,
    /// GetChatMessagesUseCase（チャット取得のユースケース）
    pub get_chat_messages_usecase: Arc<GetChatMessagesUseCase>,
    /// DeleteChatMessagesUseCase（チャット削除のユースケース）
    pub delete_chat_messages_usecase: Arc<DeleteChatMessagesUseCase>,
    /// MessagePusher（応答を呼び出し元の接続に送る）
    pub message_pusher: Arc<dyn MessagePusher>,
}

impl AppState {
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            connections,
            rooms,
            streams,
            subscriptions,
            notifications,
            chat_messages,
            message_pusher,
            token_verifier,
            state_ttl,
        } = collaborators;

        let notifier = Arc::new(UserNotifier::new(
            connections.clone(),
            message_pusher.clone(),
        ));
        let leave_stream_usecase = Arc::new(LeaveStreamUseCase::new(
            streams.clone(),
            rooms.clone(),
            connections.clone(),
            message_pusher.clone(),
        ));

        Self {
            connect_client_usecase: Arc::new(ConnectClientUseCase::new(
                connections.clone(),
                message_pusher.clone(),
                token_verifier,
            )),
            disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                leave_stream_usecase.clone(),
            )),
            refresh_presence_usecase: Arc::new(RefreshPresenceUseCase::new(
                connections.clone(),
                rooms.clone(),
                state_ttl,
            )),
            join_stream_usecase: Arc::new(JoinStreamUseCase::new(
                streams.clone(),
                rooms.clone(),
                connections,
                message_pusher.clone(),
            )),
            leave_stream_usecase,
            get_stream_room_info_usecase: Arc::new(GetStreamRoomInfoUseCase::new(rooms.clone())),
            start_stream_usecase: Arc::new(StartStreamUseCase::new(
                streams.clone(),
                subscriptions.clone(),
                message_pusher.clone(),
                notifier.clone(),
            )),
            end_stream_usecase: Arc::new(EndStreamUseCase::new(
                streams,
                rooms,
                message_pusher.clone(),
            )),
            send_notification_usecase: Arc::new(SendNotificationUseCase::new(
                subscriptions,
                notifications,
                notifier,
            )),
            send_chat_message_usecase: Arc::new(SendChatMessageUseCase::new(
                chat_messages.clone(),
                message_pusher.clone(),
            )),
            get_chat_messages_usecase: Arc::new(GetChatMessagesUseCase::new(
                chat_messages.clone(),
            )),
            delete_chat_messages_usecase: Arc::new(DeleteChatMessagesUseCase::new(
                chat_messages,
                message_pusher.clone(),
            )),
            message_pusher,
        }
    }
}
