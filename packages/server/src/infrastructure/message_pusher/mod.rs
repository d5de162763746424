//! メッセージ送信（通知）の実装
//!
//! ## 実装
//!
//! - `websocket`: WebSocket を使った実装（プロセスローカル）

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
