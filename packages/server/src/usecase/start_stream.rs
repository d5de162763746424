//! UseCase: 配信開始処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StartStreamUseCase::execute() メソッド
//! - 配信状態の更新とフォロワーへの配信開始通知
//!
//! ### なぜこのテストが必要か
//! - 配信者本人以外が配信を開始できないことを保証する
//! - 接続中のフォロワーにだけ配信開始が届くことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：予定されていた配信の開始
//! - 異常系：未認証、配信者以外、存在しない配信

use std::sync::Arc;

use futures_util::future::join_all;

use crate::domain::{
    ConnectionId, MessagePusher, ServerEvent, Stream, StreamDetails, StreamId, StreamRepository,
    StreamStatus, SubscriptionRepository, UserId,
};

use super::{error::StreamLifecycleError, notifier::UserNotifier};

/// 配信開始の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedStream {
    pub stream: Stream,
    /// 配信開始を受け取ったフォロワー数
    pub notified_followers: usize,
}

/// 配信開始のユースケース
pub struct StartStreamUseCase {
    streams: Arc<dyn StreamRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    notifier: Arc<UserNotifier>,
}

impl StartStreamUseCase {
    pub fn new(
        streams: Arc<dyn StreamRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        notifier: Arc<UserNotifier>,
    ) -> Self {
        Self {
            streams,
            subscriptions,
            message_pusher,
            notifier,
        }
    }

    /// 配信開始を実行
    ///
    /// # Arguments
    ///
    /// * `actor` - 認証済みユーザー（未認証なら None）
    /// * `connection_id` - 配信者の接続（配信のルームを購読させる）
    /// * `stream_id` - 開始する配信
    /// * `details` - 上書きするタイトルや URL
    pub async fn execute(
        &self,
        actor: Option<UserId>,
        connection_id: &ConnectionId,
        stream_id: StreamId,
        details: StreamDetails,
    ) -> Result<StartedStream, StreamLifecycleError> {
        let actor = actor.ok_or(StreamLifecycleError::Unauthenticated)?;

        let stream = self
            .streams
            .find_by_id(stream_id)
            .await?
            .ok_or(StreamLifecycleError::StreamNotFound(stream_id))?;
        if !stream.is_owned_by(actor) {
            return Err(StreamLifecycleError::NotOwner {
                stream_id,
                user_id: actor,
            });
        }

        let stream = self
            .streams
            .start_stream(stream_id, details, StreamStatus::Live)
            .await?;
        tracing::info!("Stream {} is live (owner {})", stream_id, actor);

        self.message_pusher.join_room(stream_id, connection_id).await;

        let notified_followers = self.announce(&stream).await;

        Ok(StartedStream {
            stream,
            notified_followers,
        })
    }

    /// 接続中のフォロワーに配信開始を送る（届かなかった分は破棄）
    async fn announce(&self, stream: &Stream) -> usize {
        let followers = match self
            .subscriptions
            .find_by_subscribed_to_id(stream.user_id)
            .await
        {
            Ok(followers) => followers,
            Err(e) => {
                tracing::error!(
                    "Failed to resolve followers of user {}: {}",
                    stream.user_id,
                    e
                );
                return 0;
            }
        };

        let event = ServerEvent::StreamStarted {
            stream: stream.clone(),
        };
        let results = join_all(
            followers
                .iter()
                .map(|s| self.notifier.emit_to_user(s.subscriber_id, &event)),
        )
        .await;
        let delivered = results.into_iter().filter(|delivered| *delivered).count();

        tracing::info!(
            "Announced stream {} to {}/{} followers",
            stream.id,
            delivered,
            followers.len()
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestWorld, stream, user};

    #[tokio::test]
    async fn test_start_stream_announces_to_online_followers() {
        // テスト項目: 配信を開始すると接続中のフォロワーにだけ配信開始が届く
        // given (前提条件):
        let world = TestWorld::new();
        world.add_stream(42, 10, StreamStatus::Scheduled).await;
        world.follow(11, 10).await;
        world.follow(12, 10).await;
        let owner = world.connect("owner", Some(10)).await;
        let mut follower = world.connect("follower", Some(11)).await;
        let mut stranger = world.connect("stranger", Some(99)).await;

        // when (操作):
        let started = world
            .start_stream()
            .execute(
                Some(user(10)),
                &owner.connection_id,
                stream(42),
                StreamDetails {
                    title: Some("Friday night".into()),
                    stream_url: Some("rtmp://live/42".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(started.stream.status, StreamStatus::Live);
        assert_eq!(started.stream.title, "Friday night");
        assert_eq!(started.notified_followers, 1);
        let announced = follower.payloads_of("streamStarted");
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0]["streamId"], 42);
        assert_eq!(announced[0]["userId"], 10);
        assert_eq!(announced[0]["streamUrl"], "rtmp://live/42");
        assert!(stranger.drain().is_empty());
        assert!(world.streams.find_by_id(stream(42)).await.unwrap().unwrap().is_live());
    }

    #[tokio::test]
    async fn test_start_stream_subscribes_owner_to_room() {
        // テスト項目: 配信者は配信のルームを購読し、視聴者数の更新を受け取る
        // given (前提条件):
        let world = TestWorld::new();
        world.add_stream(42, 10, StreamStatus::Scheduled).await;
        let mut owner = world.connect("owner", Some(10)).await;
        let viewer = world.connect("viewer", Some(1)).await;
        world
            .start_stream()
            .execute(Some(user(10)), &owner.connection_id, stream(42), StreamDetails::default())
            .await
            .unwrap();

        // when (操作):
        world
            .join_stream()
            .execute(&viewer.connection_id, stream(42), user(1))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(owner.viewer_counts(), vec![1]);
    }

    #[tokio::test]
    async fn test_start_stream_requires_owner() {
        // テスト項目: 未認証・配信者以外は配信を開始できず、状態も変わらない
        // given (前提条件):
        let world = TestWorld::new();
        world.add_stream(42, 10, StreamStatus::Scheduled).await;
        let intruder = world.connect("intruder", Some(11)).await;
        let usecase = world.start_stream();

        // when (操作):
        let anonymous = usecase
            .execute(None, &intruder.connection_id, stream(42), StreamDetails::default())
            .await;
        let not_owner = usecase
            .execute(Some(user(11)), &intruder.connection_id, stream(42), StreamDetails::default())
            .await;
        let missing = usecase
            .execute(Some(user(11)), &intruder.connection_id, stream(43), StreamDetails::default())
            .await;

        // then (期待する結果):
        assert_eq!(anonymous, Err(StreamLifecycleError::Unauthenticated));
        assert_eq!(
            not_owner,
            Err(StreamLifecycleError::NotOwner {
                stream_id: stream(42),
                user_id: user(11),
            })
        );
        assert_eq!(missing, Err(StreamLifecycleError::StreamNotFound(stream(43))));
        let current = world.streams.find_by_id(stream(42)).await.unwrap().unwrap();
        assert_eq!(current.status, StreamStatus::Scheduled);
    }
}
