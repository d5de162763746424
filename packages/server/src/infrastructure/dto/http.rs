//! HTTP API response DTOs.

use serde::Serialize;

pub use super::websocket::RoomInfoDto;

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthDto {
    pub status: String,
}

/// `GET /api/streams/{id}/viewers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCountDto {
    pub stream_id: i64,
    pub count: usize,
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponseDto {
    pub message: String,
    pub status: u16,
}
