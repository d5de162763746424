//! 共有 Key-Value ストア
//!
//! 複数のサーバープロセス間で状態を共有するための唯一の手段です。
//! プロセス内のメモリだけに正本を置くことはありません。
//!
//! ## 提供する操作
//!
//! - 基本操作: `get` / `set`（TTL 付き）/ `delete`
//! - アトミック操作: `set_if_absent`, `delete_if_equals`, 集合操作（`set_add` など）
//!
//! 読み込み → 書き戻しの間に他プロセスの更新を失わないよう、
//! リポジトリはアトミック操作だけで状態を更新します。
//!
//! ## 実装
//!
//! - `inmemory`: 単一プロセス・テスト用
//! - `redis`: Redis（`aio::ConnectionManager`）

pub mod inmemory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RepositoryError;

pub use self::inmemory::InMemoryKeyValueStore;
pub use self::redis::RedisKeyValueStore;

/// KV ストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    #[error("key '{0}' holds a value of the wrong type")]
    WrongType(String),

    #[error("failed to serialize value for key '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(reason) => RepositoryError::StoreUnavailable(reason),
            StoreError::WrongType(key) => RepositoryError::Corrupted {
                key,
                reason: "wrong value type".to_string(),
            },
            StoreError::Serialization { key, reason } => RepositoryError::Corrupted { key, reason },
        }
    }
}

/// 共有 Key-Value ストア trait
///
/// 値は文字列（JSON など）として保存します。
/// `ttl` が `None` の場合は期限なしで保存します。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// キーを削除し、削除したかどうかを返す
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// キーが存在しない場合だけ保存し、保存したかどうかを返す
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// 現在の値が `expected` と一致する場合だけ削除する（compare-and-delete）
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// 集合にメンバーを追加し、新規に追加されたかどうかを返す
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// 集合からメンバーを削除し、削除したかどうかを返す
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn set_len(&self, key: &str) -> Result<usize, StoreError>;

    /// 有効期限を設定し、キーが存在したかどうかを返す
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}
