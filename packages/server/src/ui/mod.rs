//! Streamhub presence server (axum + WebSocket).

pub mod dispatch;
mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::{AppState, Collaborators};
