//! 値オブジェクト
//!
//! ID はすべて生成時に検証され、不正な値を持つインスタンスは存在しません。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use streamhub_shared::time::current_timestamp_millis;

use super::error::ValueObjectError;

/// WebSocket 接続の識別子
///
/// 1 接続につき 1 つ、接続受付時に UUID v4 で採番されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyConnectionId);
        }
        Ok(Self(value))
    }

    /// 新しい接続 ID を採番
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ConnectionId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// リレーショナルストア由来の正の整数 ID を定義する
macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Result<Self, ValueObjectError> {
                if value <= 0 {
                    return Err(ValueObjectError::NonPositiveId { kind: $kind, value });
                }
                Ok(Self(value))
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValueObjectError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ValueObjectError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ValueObjectError::MalformedId { kind: $kind, raw: s.to_string() })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// ユーザー ID
    UserId,
    "user"
);
positive_id!(
    /// ライブ配信 ID
    StreamId,
    "stream"
);
positive_id!(
    /// チャットメッセージ ID
    MessageId,
    "message"
);

/// Unix タイムスタンプ（UTC, ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn now() -> Self {
        Self(current_timestamp_millis())
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_rejects_blank() {
        // テスト項目: 空白のみの接続 ID は作成できない
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result = ConnectionId::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyConnectionId));
    }

    #[test]
    fn test_connection_id_generate_is_unique() {
        // テスト項目: 採番した接続 ID は毎回異なる
        // given (前提条件):

        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_positive_ids_reject_zero_and_negative() {
        // テスト項目: 0 以下の ID はエラーになる
        // given (前提条件):

        // when (操作):
        let zero = UserId::new(0);
        let negative = StreamId::new(-3);

        // then (期待する結果):
        assert_eq!(
            zero,
            Err(ValueObjectError::NonPositiveId { kind: "user", value: 0 })
        );
        assert!(negative.is_err());
        assert_eq!(MessageId::new(7).unwrap().value(), 7);
    }

    #[test]
    fn test_stream_id_from_str() {
        // テスト項目: 数値文字列から StreamId を生成できる（不正な文字列はエラー）
        // given (前提条件):

        // when (操作):
        let ok: Result<StreamId, _> = " 42 ".parse();
        let bad: Result<StreamId, _> = "forty-two".parse();

        // then (期待する結果):
        assert_eq!(ok.unwrap().value(), 42);
        assert!(matches!(bad, Err(ValueObjectError::MalformedId { kind: "stream", .. })));
    }

    #[test]
    fn test_ids_are_validated_on_deserialize() {
        // テスト項目: JSON から読み込む ID も 0 以下は拒否される
        // given (前提条件):
        let zero = "0";

        // when (操作):
        let result: Result<UserId, _> = serde_json::from_str(zero);

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(serde_json::from_str::<UserId>("11").unwrap().value(), 11);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        // テスト項目: ID は素の値としてシリアライズされる
        // given (前提条件):
        let stream_id = StreamId::new(42).unwrap();
        let connection_id = ConnectionId::new("abc".to_string()).unwrap();

        // when (操作):
        let stream_json = serde_json::to_string(&stream_id).unwrap();
        let connection_json = serde_json::to_string(&connection_id).unwrap();

        // then (期待する結果):
        assert_eq!(stream_json, "42");
        assert_eq!(connection_json, "\"abc\"");
    }
}
