//! InMemory Stream Repository 実装
//!
//! 配信の CRUD はこのサーバーの対象外のため、起動時に与えられた配信を保持し、
//! 状態遷移だけを受け付けます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, Stream, StreamDetails, StreamId, StreamRepository, StreamStatus};

pub struct InMemoryStreamRepository {
    streams: Mutex<HashMap<StreamId, Stream>>,
}

impl InMemoryStreamRepository {
    pub fn new(streams: Vec<Stream>) -> Self {
        Self {
            streams: Mutex::new(streams.into_iter().map(|s| (s.id, s)).collect()),
        }
    }

    /// 配信を追加（同じ ID があれば置き換え）
    pub async fn insert(&self, stream: Stream) {
        self.streams.lock().await.insert(stream.id, stream);
    }
}

fn not_found(stream_id: StreamId) -> RepositoryError {
    RepositoryError::NotFound(format!("stream {}", stream_id))
}

#[async_trait]
impl StreamRepository for InMemoryStreamRepository {
    async fn find_by_id(&self, stream_id: StreamId) -> Result<Option<Stream>, RepositoryError> {
        Ok(self.streams.lock().await.get(&stream_id).cloned())
    }

    async fn update_status(
        &self,
        stream_id: StreamId,
        status: StreamStatus,
    ) -> Result<Stream, RepositoryError> {
        let mut streams = self.streams.lock().await;
        let stream = streams.get_mut(&stream_id).ok_or_else(|| not_found(stream_id))?;
        stream.status = status;
        Ok(stream.clone())
    }

    async fn start_stream(
        &self,
        stream_id: StreamId,
        details: StreamDetails,
        status: StreamStatus,
    ) -> Result<Stream, RepositoryError> {
        let mut streams = self.streams.lock().await;
        let stream = streams.get_mut(&stream_id).ok_or_else(|| not_found(stream_id))?;
        if let Some(title) = details.title {
            stream.title = title;
        }
        if details.description.is_some() {
            stream.description = details.description;
        }
        if details.thumbnail_url.is_some() {
            stream.thumbnail_url = details.thumbnail_url;
        }
        if details.stream_url.is_some() {
            stream.stream_url = details.stream_url;
        }
        stream.status = status;
        Ok(stream.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn scheduled(id: i64, owner: i64) -> Stream {
        Stream {
            id: StreamId::new(id).unwrap(),
            user_id: UserId::new(owner).unwrap(),
            title: "before".to_string(),
            description: Some("desc".to_string()),
            thumbnail_url: None,
            stream_url: None,
            status: StreamStatus::Scheduled,
        }
    }

    #[tokio::test]
    async fn test_start_stream_applies_details() {
        // テスト項目: 配信開始で状態と指定された項目だけが更新される
        // given (前提条件):
        let repo = InMemoryStreamRepository::new(vec![scheduled(42, 10)]);
        let details = StreamDetails {
            title: Some("live now".to_string()),
            stream_url: Some("rtmp://example/42".to_string()),
            ..Default::default()
        };

        // when (操作):
        let stream = repo
            .start_stream(StreamId::new(42).unwrap(), details, StreamStatus::Live)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(stream.status, StreamStatus::Live);
        assert_eq!(stream.title, "live now");
        assert_eq!(stream.description.as_deref(), Some("desc"));
        assert_eq!(stream.stream_url.as_deref(), Some("rtmp://example/42"));
        let stored = repo.find_by_id(StreamId::new(42).unwrap()).await.unwrap();
        assert_eq!(stored, Some(stream));
    }

    #[tokio::test]
    async fn test_update_status_of_unknown_stream() {
        // テスト項目: 存在しない配信の状態更新は NotFound になる
        // given (前提条件):
        let repo = InMemoryStreamRepository::new(vec![]);

        // when (操作):
        let result = repo
            .update_status(StreamId::new(1).unwrap(), StreamStatus::Ended)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
