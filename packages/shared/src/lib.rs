//! Utilities shared by the Streamhub binaries and tests.

pub mod logger;
pub mod time;
