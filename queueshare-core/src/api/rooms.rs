use std::fmt::Display;

use serde_json::json;

use crate::{
    ApiClient, ApiRequest, ApiResult, GuestRegistration, NewRoom, QueuePayload, RoomCredentials,
    RoomData, RoomMember, RoomRole, Track,
};

/// A command that changes what a room is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Next,
    Previous,
}

impl PlaybackCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

impl Display for PlaybackCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room management, playback control and search within a room
#[derive(Debug, Clone)]
pub struct RoomsApi {
    client: ApiClient,
}

impl RoomsApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Fetches a room, which is how it is joined. Anonymous visitors pass no credentials.
    pub async fn room(
        &self,
        code: &str,
        credentials: Option<&RoomCredentials>,
    ) -> ApiResult<RoomData> {
        let mut request = ApiRequest::get("/room").segment(code)
            .expect_fields(&["name", "code", "host", "role"]);

        if let Some(credentials) = credentials {
            request = request.room(credentials);
        }

        self.client.send(request).await
    }

    pub async fn create_room(&self, token: &str, name: &str, password: &str) -> ApiResult<RoomData> {
        self.client
            .send(
                ApiRequest::post("/room")
                    .bearer(token)
                    .json(&NewRoom { name, password })
                    .expect_fields(&["name", "code", "host", "role"]),
            )
            .await
    }

    pub async fn delete_room(&self, token: &str, code: &str) -> ApiResult<()> {
        self.client
            .execute(ApiRequest::delete("/room").segment(code).bearer(token))
            .await
            .map(|_| ())
    }

    /// Registers a guest display name, returning the new guest id
    pub async fn register_guest(
        &self,
        code: &str,
        name: &str,
        password: &str,
    ) -> ApiResult<GuestRegistration> {
        self.client
            .send(
                ApiRequest::post("/room").segment(code).segment("guest")
                    .basic(name, password)
                    .json(&json!({ "name": name }))
                    .expect_fields(&["guest_id"]),
            )
            .await
    }

    pub async fn add_member(
        &self,
        token: &str,
        code: &str,
        username: &str,
        role: RoomRole,
    ) -> ApiResult<RoomMember> {
        self.client
            .send(
                ApiRequest::post("/room").segment(code).segment("members")
                    .bearer(token)
                    .json(&RoomMember {
                        username: username.to_string(),
                        role,
                    }),
            )
            .await
    }

    pub async fn queue(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<QueuePayload> {
        self.client
            .send(ApiRequest::get("/room").segment(code).segment("queue").room(credentials))
            .await
    }

    pub async fn playback(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        command: PlaybackCommand,
    ) -> ApiResult<QueuePayload> {
        self.client
            .send(ApiRequest::post("/room").segment(code).segment(command).room(credentials))
            .await
    }

    pub async fn enqueue(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        track_id: &str,
    ) -> ApiResult<QueuePayload> {
        self.client
            .send(
                ApiRequest::post("/room").segment(code).segment("queue")
                    .room(credentials)
                    .json(&json!({ "track_id": track_id })),
            )
            .await
    }

    pub async fn search(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        query: &str,
    ) -> ApiResult<Vec<Track>> {
        self.client
            .send(
                ApiRequest::get("/room").segment(code).segment("search")
                    .room(credentials)
                    .query("q", query),
            )
            .await
    }

    pub async fn suggested(
        &self,
        code: &str,
        credentials: &RoomCredentials,
    ) -> ApiResult<Vec<Track>> {
        self.client
            .send(ApiRequest::get("/room").segment(code).segment("suggested").room(credentials))
            .await
    }
}
