//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{RoomLookup, StreamId},
    infrastructure::dto::http::{ErrorResponseDto, HealthDto, RoomInfoDto, ViewerCountDto},
    ui::state::AppState,
};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponseDto {
            message: message.into(),
            status: status.as_u16(),
        }),
    )
        .into_response()
}

fn parse_stream_id(raw: &str) -> Result<StreamId, Response> {
    raw.parse::<i64>()
        .ok()
        .and_then(|id| StreamId::new(id).ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid stream id '{}'", raw),
            )
        })
}

fn status_of(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Get the room of a stream
pub async fn get_stream_room(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Response {
    let stream_id = match parse_stream_id(&stream_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.get_stream_room_info_usecase.execute(stream_id).await {
        // Domain Model から DTO への変換
        Ok(RoomLookup::Found(room)) => Json(RoomInfoDto::from(&room)).into_response(),
        Ok(RoomLookup::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Stream room not found")
        }
        Err(e) => {
            tracing::error!("Failed to load room of stream {}: {}", stream_id, e);
            error_response(status_of(e.status()), e.to_string())
        }
    }
}

/// Get the current viewer count of a stream
pub async fn get_stream_viewers(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Response {
    let stream_id = match parse_stream_id(&stream_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state
        .get_stream_room_info_usecase
        .viewer_count(stream_id)
        .await
    {
        Ok(count) => Json(ViewerCountDto {
            stream_id: stream_id.value(),
            count,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to count viewers of stream {}: {}", stream_id, e);
            error_response(status_of(e.status()), e.to_string())
        }
    }
}
