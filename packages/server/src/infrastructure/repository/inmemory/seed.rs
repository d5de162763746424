//! 協調リポジトリの初期データ
//!
//! 配信・フォロー関係・ユーザー表示情報の CRUD はこのサーバーの対象外のため、
//! 起動時に JSON ファイルから読み込みます。
//!
//! ```json
//! {
//!   "streams": [{"id": 42, "user_id": 10, "title": "Morning", "status": "scheduled"}],
//!   "subscriptions": [{"subscriber_id": 11, "subscribed_to_id": 10}],
//!   "users": [{"id": 10, "username": "broadcaster", "avatar": null}]
//! }
//! ```

use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ChatAuthor, Stream, Subscription, UserId};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// チャット投稿者の表示情報
    pub fn authors(&self) -> HashMap<UserId, ChatAuthor> {
        self.users
            .iter()
            .map(|u| {
                (
                    u.id,
                    ChatAuthor {
                        username: u.username.clone(),
                        avatar: u.avatar.clone(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StreamStatus;

    #[test]
    fn test_parse_seed() {
        // テスト項目: 初期データの JSON を読み込める（省略した項目は空）
        // given (前提条件):
        let json = r#"{
            "streams": [{"id": 42, "user_id": 10, "title": "Morning", "status": "live"}],
            "users": [{"id": 10, "username": "broadcaster"}]
        }"#;

        // when (操作):
        let seed = SeedData::from_json(json).unwrap();

        // then (期待する結果):
        assert_eq!(seed.streams.len(), 1);
        assert_eq!(seed.streams[0].status, StreamStatus::Live);
        assert!(seed.streams[0].description.is_none());
        assert!(seed.subscriptions.is_empty());
        let authors = seed.authors();
        assert_eq!(authors[&UserId::new(10).unwrap()].username, "broadcaster");
    }

    #[test]
    fn test_rejects_invalid_seed() {
        // テスト項目: 0 以下の ID や形式の誤りは Parse エラーになる
        // given (前提条件):
        let zero_id = r#"{"streams": [{"id": 0, "user_id": 10, "title": "x", "status": "live"}]}"#;
        let not_a_list = r#"{"streams": "not-a-list"}"#;

        // when (操作):
        let zero_result = SeedData::from_json(zero_id);
        let list_result = SeedData::from_json(not_a_list);

        // then (期待する結果):
        assert!(matches!(zero_result, Err(SeedError::Parse(_))));
        assert!(matches!(list_result, Err(SeedError::Parse(_))));
    }
}
