use async_trait::async_trait;
use queueshare_core::{
    api::{PlaybackCommand, RoomsApi},
    ApiResult, QueuePayload, RoomCredentials, Track,
};

/// The room-scoped calls made on behalf of whoever is in the room
#[async_trait]
pub trait RoomBackend: Send + Sync {
    async fn queue(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<QueuePayload>;
    async fn playback(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        command: PlaybackCommand,
    ) -> ApiResult<QueuePayload>;
    async fn enqueue(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        track_id: &str,
    ) -> ApiResult<QueuePayload>;
    async fn search(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        query: &str,
    ) -> ApiResult<Vec<Track>>;
    async fn suggested(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<Vec<Track>>;
}

#[async_trait]
impl RoomBackend for RoomsApi {
    async fn queue(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<QueuePayload> {
        RoomsApi::queue(self, code, credentials).await
    }

    async fn playback(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        command: PlaybackCommand,
    ) -> ApiResult<QueuePayload> {
        RoomsApi::playback(self, code, credentials, command).await
    }

    async fn enqueue(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        track_id: &str,
    ) -> ApiResult<QueuePayload> {
        RoomsApi::enqueue(self, code, credentials, track_id).await
    }

    async fn search(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        query: &str,
    ) -> ApiResult<Vec<Track>> {
        RoomsApi::search(self, code, credentials, query).await
    }

    async fn suggested(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<Vec<Track>> {
        RoomsApi::suggested(self, code, credentials).await
    }
}
