//! Fixtures shared by the unit tests

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use queueshare_core::{
    api::PlaybackCommand, ApiClient, ApiResult, Config, MemoryStorage, NowPlaying, QueuePayload,
    RoomCredentials, RoomData, RoomHost, RoomRole, Storage, Track,
};

use crate::{AuthAction, Collab, RoomBackend, ToastReceiver};

pub fn track(id: &str, added_by: Option<&str>) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Track {}", id),
        artists: vec!["Someone".to_string()],
        album_art: None,
        added_by: added_by.map(str::to_string),
    }
}

pub fn payload(playing: &str, paused: bool, queue: &[&str]) -> QueuePayload {
    QueuePayload {
        currently_playing: Some(NowPlaying {
            track: track(playing, None),
            paused,
        }),
        queue: Some(queue.iter().map(|id| track(id, None)).collect()),
    }
}

pub fn room_data(code: &str, password: Option<&str>) -> RoomData {
    RoomData {
        name: "Friday".to_string(),
        code: code.to_string(),
        host: RoomHost {
            id: "u1".to_string(),
            username: "mary".to_string(),
            display_name: None,
            spotify_name: None,
        },
        role: RoomRole::Member,
        guest_name: None,
        password: password.map(str::to_string),
    }
}

/// A room backend answering from a script and remembering what it was asked
#[derive(Default)]
pub struct FakeBackend {
    queue_responses: Mutex<VecDeque<(Duration, ApiResult<QueuePayload>)>>,
    searches: Mutex<HashMap<String, (Duration, ApiResult<Vec<Track>>)>>,
    calls: Mutex<Vec<(String, RoomCredentials)>>,
}

impl FakeBackend {
    /// Queues the answer to the next queue, playback or enqueue call
    pub fn respond(&self, response: ApiResult<QueuePayload>) {
        self.respond_after(Duration::ZERO, response);
    }

    pub fn respond_after(&self, delay: Duration, response: ApiResult<QueuePayload>) {
        self.queue_responses.lock().push_back((delay, response));
    }

    pub fn search_answer(&self, query: &str, delay: Duration, response: ApiResult<Vec<Track>>) {
        self.searches
            .lock()
            .insert(query.to_string(), (delay, response));
    }

    /// The calls made so far, like `playback ABC pause`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn last_credentials(&self) -> Option<RoomCredentials> {
        self.calls.lock().last().map(|(_, credentials)| credentials.clone())
    }

    fn record(&self, call: String, credentials: &RoomCredentials) {
        self.calls.lock().push((call, credentials.clone()));
    }

    async fn next_queue_response(&self) -> ApiResult<QueuePayload> {
        let next = self.queue_responses.lock().pop_front();
        let (delay, response) = next.unwrap_or((Duration::ZERO, Ok(QueuePayload::default())));

        tokio::time::sleep(delay).await;
        response
    }
}

#[async_trait]
impl RoomBackend for FakeBackend {
    async fn queue(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<QueuePayload> {
        self.record(format!("queue {}", code), credentials);
        self.next_queue_response().await
    }

    async fn playback(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        command: PlaybackCommand,
    ) -> ApiResult<QueuePayload> {
        self.record(format!("playback {} {}", code, command), credentials);
        self.next_queue_response().await
    }

    async fn enqueue(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        track_id: &str,
    ) -> ApiResult<QueuePayload> {
        self.record(format!("enqueue {} {}", code, track_id), credentials);
        self.next_queue_response().await
    }

    async fn search(
        &self,
        code: &str,
        credentials: &RoomCredentials,
        query: &str,
    ) -> ApiResult<Vec<Track>> {
        self.record(format!("search {} {}", code, query), credentials);

        let answer = self.searches.lock().get(query).cloned();
        let (delay, response) = answer.unwrap_or((Duration::ZERO, Ok(Vec::new())));

        tokio::time::sleep(delay).await;
        response
    }

    async fn suggested(&self, code: &str, credentials: &RoomCredentials) -> ApiResult<Vec<Track>> {
        self.record(format!("suggested {}", code), credentials);
        Ok(vec![track("s1", None)])
    }
}

/// A client wired to a fake backend and in-memory storage
pub struct Harness {
    pub collab: Collab,
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<MemoryStorage>,
    pub toasts: ToastReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        let config = Config::default();
        let client = ApiClient::new(&config).unwrap();
        let backend = Arc::new(FakeBackend::default());

        let shared: Arc<dyn Storage> = storage.clone();
        let collab = Collab::with_backend(config, client, shared, backend.clone());
        let toasts = collab.toasts();

        Self {
            collab,
            backend,
            storage,
            toasts,
        }
    }

    pub fn log_in(&self, token: &str) {
        self.collab.context().auth.dispatch(AuthAction::LoggedIn {
            token: token.to_string(),
            expires_at: Utc::now() + ChronoDuration::days(7),
        });
    }

    /// Puts the client in a room without going through the backend
    pub fn enter_room(&self, code: &str, password: Option<&str>) {
        self.collab
            .context()
            .room
            .dispatch(crate::RoomAction::Join(room_data(code, password)));
    }

    pub fn toast_messages(&self) -> Vec<String> {
        self.toasts.try_iter().map(|t| t.message).collect()
    }
}
