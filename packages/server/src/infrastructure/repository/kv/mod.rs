//! 共有 KV ストア上のリポジトリ実装
//!
//! 接続とルームの状態はプロセス間で共有されるため、ここに置きます。

pub mod connection;
pub mod room;

pub use connection::KvConnectionRepository;
pub use room::KvRoomRepository;
