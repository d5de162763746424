//! Request handlers.

mod http;
mod websocket;

pub use http::{get_stream_room, get_stream_viewers, health_check};
pub use websocket::websocket_handler;
