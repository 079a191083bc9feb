use std::sync::Arc;

use crossbeam::channel::Receiver;
use log::info;
use parking_lot::Mutex;
use queueshare_core::{
    NowPlaying, QueuePayload, RoomData, RoomHost, RoomRole, Storage, StorageExt, Track,
};
use tokio_util::sync::CancellationToken;

use crate::store::{Reducer, StateStore};

/// The room the client is currently in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    /// The stable external identifier of the room
    pub code: String,
    pub host: RoomHost,
    pub role: RoomRole,
    pub guest_name: Option<String>,
    pub password: Option<String>,
    /// Unset until the first queue response arrives, or when nothing is playing
    pub queue: Option<QueueSnapshot>,
}

/// The playback state of a room, exactly as the server last reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub currently_playing: Option<NowPlaying>,
    pub queue: Vec<Track>,
}

/// The transitions a room can go through
#[derive(Debug, Clone)]
pub enum RoomAction {
    Join(RoomData),
    /// Replaces the whole queue, `None` meaning there is no playback session
    SetQueue(Option<QueuePayload>),
    /// Optimistically flips the paused flag ahead of the server response
    SetPaused(bool),
    Clear,
}

pub struct RoomReducer;

impl Reducer for RoomReducer {
    type State = Option<Room>;
    type Action = RoomAction;

    fn reduce(state: Option<Room>, action: RoomAction) -> Option<Room> {
        match action {
            RoomAction::Join(data) => Some(data.into()),
            RoomAction::Clear => None,
            RoomAction::SetQueue(payload) => state.map(|room| Room {
                queue: payload.map(QueueSnapshot::from),
                ..room
            }),
            RoomAction::SetPaused(paused) => state.map(|mut room| {
                if let Some(playing) = room
                    .queue
                    .as_mut()
                    .and_then(|q| q.currently_playing.as_mut())
                {
                    playing.paused = paused;
                }
                room
            }),
        }
    }
}

impl From<RoomData> for Room {
    fn from(data: RoomData) -> Self {
        Self {
            name: data.name,
            code: data.code,
            host: data.host,
            role: data.role,
            guest_name: data.guest_name,
            password: data.password,
            queue: None,
        }
    }
}

impl From<QueuePayload> for QueueSnapshot {
    fn from(payload: QueuePayload) -> Self {
        Self {
            currently_playing: payload.currently_playing,
            queue: payload.queue.unwrap_or_default(),
        }
    }
}

impl QueueSnapshot {
    pub fn is_paused(&self) -> bool {
        self.currently_playing.as_ref().map_or(true, |p| p.paused)
    }

    /// Splits the queue around the currently playing entry, matched by id and
    /// attribution, into what already played and what is up next.
    /// If the playing entry isn't in the queue, everything is up next.
    pub fn played_and_up_next(&self) -> (&[Track], &[Track]) {
        let boundary = self.currently_playing.as_ref().and_then(|playing| {
            self.queue.iter().position(|track| {
                track.id == playing.track.id && track.added_by == playing.track.added_by
            })
        });

        match boundary {
            Some(index) => (&self.queue[..index], &self.queue[index + 1..]),
            None => (&[], &self.queue[..]),
        }
    }
}

/// Identifies one stay in a room. Cancelled when the room is left or joined again.
#[derive(Debug, Clone)]
pub struct RoomVisit {
    pub code: String,
    pub token: CancellationToken,
}

impl RoomVisit {
    pub fn is_over(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// The room state container, persisting room access as rooms are joined and left
pub struct RoomStore {
    state: StateStore<RoomReducer>,
    storage: Arc<dyn Storage>,
    visit: Mutex<CancellationToken>,
}

impl RoomStore {
    pub fn new(storage: &Arc<dyn Storage>) -> Self {
        Self {
            state: StateStore::new(None),
            storage: storage.clone(),
            visit: Default::default(),
        }
    }

    pub fn dispatch(&self, action: RoomAction) -> Option<Room> {
        let mut visit = self.visit.lock();

        match &action {
            RoomAction::Join(data) => {
                visit.cancel();
                *visit = CancellationToken::new();

                self.storage
                    .write_room_access(&data.code, data.password.as_deref());

                info!("Joined room {} ({}) as {:?}", data.name, data.code, data.role);
            }
            RoomAction::Clear => {
                visit.cancel();

                if self.storage.clear_room_access() > 0 {
                    info!("Left room, forgot room access");
                }
            }
            _ => {}
        }

        self.state.dispatch(action)
    }

    /// Applies an action only while the given visit lasts.
    /// Returns false, and changes nothing, if the room was left or joined again.
    pub fn dispatch_within(&self, visit: &RoomVisit, action: RoomAction) -> bool {
        // Joins and clears swap the token under this lock
        let _current = self.visit.lock();

        if visit.is_over() {
            return false;
        }

        self.state.dispatch(action);
        true
    }

    pub fn state(&self) -> Option<Room> {
        self.state.state()
    }

    pub fn subscribe(&self) -> Receiver<Option<Room>> {
        self.state.subscribe()
    }

    pub fn code(&self) -> Option<String> {
        self.state.read(|room| room.as_ref().map(|r| r.code.clone()))
    }

    pub fn role(&self) -> Option<RoomRole> {
        self.state.read(|room| room.as_ref().map(|r| r.role))
    }

    pub fn queue(&self) -> Option<QueueSnapshot> {
        self.state.read(|room| room.as_ref().and_then(|r| r.queue.clone()))
    }

    /// The current visit, if a room is joined
    pub fn visit(&self) -> Option<RoomVisit> {
        let visit = self.visit.lock();

        self.code().map(|code| RoomVisit {
            code,
            token: visit.clone(),
        })
    }
}
