//! Realtime presence and notification fan-out for Streamhub livestreams.
//!
//! Tracks which users are connected and who is watching which live stream in a
//! shared key-value store, so several server processes can run side by side,
//! and delivers live-only notifications to followers of a broadcaster.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
