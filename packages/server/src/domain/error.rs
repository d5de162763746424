//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    EmptyConnectionId,

    #[error("{kind} id must be positive, got {value}")]
    NonPositiveId { kind: &'static str, value: i64 },

    #[error("{kind} id '{raw}' is not a number")]
    MalformedId { kind: &'static str, raw: String },
}

/// Repository 操作のエラー
///
/// 共有 KV ストアの障害（`StoreUnavailable`）と、
/// 外部リポジトリへの書き込み失敗（`Persistence`）を区別します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("shared store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("corrupted record at '{key}': {reason}")]
    Corrupted { key: String, reason: String },
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// このプロセスに該当する接続が存在しない
    #[error("client '{0}' is not connected to this process")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// トークン検証のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    #[error("token invalid: {0}")]
    Invalid(String),
}
