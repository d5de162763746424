//! Infrastructure 層
//!
//! ドメイン層が定義する trait の具体的な実装を提供します。
//!
//! - `kv`: 共有 Key-Value ストア（インメモリ / Redis）
//! - `repository`: リポジトリ実装
//! - `message_pusher`: WebSocket へのイベント送信
//! - `auth`: JWT の検証
//! - `dto`: wire 形式

pub mod auth;
pub mod dto;
pub mod kv;
pub mod message_pusher;
pub mod repository;
