//! UseCase 層のエラー定義
//!
//! 各エラーはクライアントへ返すステータス（HTTP 互換）に対応します。
//!
//! | 分類 | status |
//! |------|--------|
//! | 不正な状態・入力 | 400 |
//! | 未認証 | 401 |
//! | 権限なし | 403 |
//! | 対象が存在しない | 404 |
//! | 永続化の失敗 | 500 |
//! | 共有ストアの障害 | 503 |

use thiserror::Error;

use crate::domain::{MessageId, RepositoryError, StreamId, UserId};

/// Presence（視聴者管理）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("Stream not found")]
    StreamNotFound(StreamId),

    #[error("Stream is not live")]
    StreamNotLive(StreamId),

    #[error("Shared store unavailable")]
    StoreUnavailable(String),

    #[error("Presence operation failed: {0}")]
    Repository(RepositoryError),
}

impl PresenceError {
    pub fn status(&self) -> u16 {
        match self {
            Self::StreamNotFound(_) => 404,
            Self::StreamNotLive(_) => 400,
            Self::StoreUnavailable(_) => 503,
            Self::Repository(_) => 500,
        }
    }
}

impl From<RepositoryError> for PresenceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::StoreUnavailable(reason) => Self::StoreUnavailable(reason),
            other => Self::Repository(other),
        }
    }
}

/// 配信の開始・終了のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamLifecycleError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("User {user_id} does not own stream {stream_id}")]
    NotOwner { stream_id: StreamId, user_id: UserId },

    #[error("Stream not found")]
    StreamNotFound(StreamId),

    #[error("Shared store unavailable")]
    StoreUnavailable(String),

    #[error("Failed to update stream: {0}")]
    Persistence(String),
}

impl StreamLifecycleError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::NotOwner { .. } => 403,
            Self::StreamNotFound(_) => 404,
            Self::StoreUnavailable(_) => 503,
            Self::Persistence(_) => 500,
        }
    }
}

impl From<RepositoryError> for StreamLifecycleError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::StoreUnavailable(reason) => Self::StoreUnavailable(reason),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// 通知のファンアウトのエラー（受信者単位の失敗は含まない）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Sender {sender_id} does not match the authenticated user {user_id}")]
    SenderMismatch { sender_id: UserId, user_id: UserId },

    #[error("Failed to resolve followers: {0}")]
    Persistence(String),
}

impl NotificationError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::SenderMismatch { .. } => 403,
            Self::Persistence(_) => 500,
        }
    }
}

/// チャットのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Chat message not found")]
    MessageNotFound(MessageId),

    #[error("Chat persistence failed: {0}")]
    Persistence(String),
}

impl ChatError {
    pub fn status(&self) -> u16 {
        match self {
            Self::MessageNotFound(_) => 404,
            Self::Persistence(_) => 500,
        }
    }
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        Self::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_outage_maps_to_503() {
        // テスト項目: ストア障害は 503、その他のリポジトリエラーは 500 になる
        // given (前提条件):
        let outage = RepositoryError::StoreUnavailable("refused".into());
        let corrupted = RepositoryError::Corrupted {
            key: "k".into(),
            reason: "bad json".into(),
        };

        // when (操作):
        let presence_outage = PresenceError::from(outage.clone());
        let presence_other = PresenceError::from(corrupted);
        let lifecycle_outage = StreamLifecycleError::from(outage);

        // then (期待する結果):
        assert_eq!(presence_outage.status(), 503);
        assert_eq!(presence_other.status(), 500);
        assert_eq!(lifecycle_outage.status(), 503);
    }

    #[test]
    fn test_not_live_is_invalid_state() {
        // テスト項目: live でない配信への参加は 400 になる
        // given (前提条件):
        let error = PresenceError::StreamNotLive(StreamId::new(1).unwrap());

        // when (操作):
        let status = error.status();

        // then (期待する結果):
        assert_eq!(status, 400);
        assert_eq!(error.to_string(), "Stream is not live");
    }
}
