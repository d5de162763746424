//! UseCase: フォロワーへの通知の一斉送信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendNotificationUseCase::execute() メソッド
//! - フォロワーごとの通知の保存と、接続中のフォロワーへの配信
//!
//! ### なぜこのテストが必要か
//! - 通知はオンラインかどうかに関わらずフォロワー全員分保存されることを保証する
//! - 1 人分の失敗が他のフォロワーの処理を止めないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：一部のフォロワーが接続していない場合
//! - 異常系：未認証、送信者のなりすまし、1 人分の保存失敗
//! - エッジケース：フォロワーがいない

use std::sync::Arc;

use futures_util::future::join_all;

use crate::domain::{
    NewNotification, NotificationRepository, RepositoryError, ServerEvent, Subscription,
    SubscriptionRepository, UserId,
};

use super::{error::NotificationError, notifier::UserNotifier};

/// 送信する通知の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub sender_id: UserId,
    pub type_id: i64,
    pub message: String,
    pub related_id: Option<i64>,
}

/// 一斉送信の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// 対象のフォロワー数
    pub recipients: usize,
    /// 保存できた通知の数
    pub persisted: usize,
    /// 接続中のフォロワーに届いた数
    pub delivered: usize,
    /// 保存に失敗したフォロワー
    pub failures: Vec<(UserId, RepositoryError)>,
}

enum RecipientOutcome {
    Delivered,
    Stored,
    Failed(UserId, RepositoryError),
}

/// 通知一斉送信のユースケース
pub struct SendNotificationUseCase {
    subscriptions: Arc<dyn SubscriptionRepository>,
    notifications: Arc<dyn NotificationRepository>,
    notifier: Arc<UserNotifier>,
}

impl SendNotificationUseCase {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        notifications: Arc<dyn NotificationRepository>,
        notifier: Arc<UserNotifier>,
    ) -> Self {
        Self {
            subscriptions,
            notifications,
            notifier,
        }
    }

    /// 一斉送信を実行
    ///
    /// フォロワーごとの処理は並行に実行し、すべての完了を待ってから結果を返します。
    pub async fn execute(
        &self,
        actor: Option<UserId>,
        request: NotificationRequest,
    ) -> Result<FanoutReport, NotificationError> {
        let actor = actor.ok_or(NotificationError::Unauthenticated)?;
        if actor != request.sender_id {
            return Err(NotificationError::SenderMismatch {
                sender_id: request.sender_id,
                user_id: actor,
            });
        }

        let followers = self
            .subscriptions
            .find_by_subscribed_to_id(request.sender_id)
            .await
            .map_err(|e| NotificationError::Persistence(e.to_string()))?;

        let outcomes = join_all(
            followers
                .iter()
                .map(|subscription| self.notify_follower(subscription, &request)),
        )
        .await;

        let mut report = FanoutReport {
            recipients: followers.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                RecipientOutcome::Delivered => {
                    report.persisted += 1;
                    report.delivered += 1;
                }
                RecipientOutcome::Stored => report.persisted += 1,
                RecipientOutcome::Failed(user_id, e) => report.failures.push((user_id, e)),
            }
        }

        tracing::info!(
            "Notification from user {}: {} recipients, {} persisted, {} delivered, {} failed",
            request.sender_id,
            report.recipients,
            report.persisted,
            report.delivered,
            report.failures.len()
        );
        Ok(report)
    }

    async fn notify_follower(
        &self,
        subscription: &Subscription,
        request: &NotificationRequest,
    ) -> RecipientOutcome {
        let follower = subscription.subscriber_id;
        let notification = match self
            .notifications
            .create(NewNotification {
                user_id: follower,
                sender_id: request.sender_id,
                type_id: request.type_id,
                related_id: request.related_id,
                message: request.message.clone(),
                is_read: false,
            })
            .await
        {
            Ok(notification) => notification,
            Err(e) => {
                tracing::error!("Failed to persist notification for user {}: {}", follower, e);
                return RecipientOutcome::Failed(follower, e);
            }
        };

        if self
            .notifier
            .emit_to_user(follower, &ServerEvent::FollowerNotification(notification))
            .await
        {
            RecipientOutcome::Delivered
        } else {
            RecipientOutcome::Stored
        }
    }
}
