use log::{debug, info, warn};
use queueshare_core::{api::PlaybackCommand, ApiResult, QueuePayload, RoomCredentials};

use crate::{CollabContext, RoomAction, RoomError, RoomVisit};

/// A call that returns the authoritative playback state of the room
#[derive(Debug, Clone, PartialEq, Eq)]
enum QueueMutation {
    Refresh,
    Playback(PlaybackCommand),
    Enqueue(String),
}

impl QueueMutation {
    /// Playback commands take a moment to reach the player, so the queue is fetched again after
    fn needs_refetch(&self) -> bool {
        matches!(self, Self::Playback(_))
    }
}

/// Keeps the joined room's queue in line with the server
#[derive(Clone)]
pub struct QueueSync {
    context: CollabContext,
}

impl QueueSync {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn refresh(&self) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Refresh).await
    }

    pub async fn play(&self) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Playback(PlaybackCommand::Play))
            .await
    }

    pub async fn pause(&self) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Playback(PlaybackCommand::Pause))
            .await
    }

    /// Plays if paused or idle, pauses otherwise
    pub async fn toggle_playback(&self) -> Result<(), RoomError> {
        let paused = self
            .context
            .room
            .queue()
            .map_or(true, |queue| queue.is_paused());

        if paused {
            self.play().await
        } else {
            self.pause().await
        }
    }

    pub async fn skip_next(&self) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Playback(PlaybackCommand::Next))
            .await
    }

    pub async fn skip_previous(&self) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Playback(PlaybackCommand::Previous))
            .await
    }

    pub async fn enqueue(&self, track_id: &str) -> Result<(), RoomError> {
        self.mutate(QueueMutation::Enqueue(track_id.to_string()))
            .await
    }

    async fn mutate(&self, mutation: QueueMutation) -> Result<(), RoomError> {
        let visit = self.context.room.visit().ok_or(RoomError::NotJoined)?;
        let credentials = self
            .context
            .room_credentials()
            .ok_or(RoomError::NoCredentials)?;

        match mutation {
            QueueMutation::Playback(PlaybackCommand::Play) => {
                self.context.room.dispatch(RoomAction::SetPaused(false));
            }
            QueueMutation::Playback(PlaybackCommand::Pause) => {
                self.context.room.dispatch(RoomAction::SetPaused(true));
            }
            _ => {}
        }

        let result = self.send(&visit, &credentials, &mutation).await;

        let applied = match result {
            Ok(payload) => self
                .context
                .room
                .dispatch_within(&visit, RoomAction::SetQueue(Some(payload))),
            Err(_) if visit.is_over() => false,
            Err(error) => {
                self.context.report(&error);
                return Err(RoomError::Api(error));
            }
        };

        if !applied {
            debug!("Discarding {:?} response for room {}, it was left", mutation, visit.code);
            return Ok(());
        }

        if mutation.needs_refetch() {
            self.schedule_refetch(visit);
        }

        Ok(())
    }

    async fn send(
        &self,
        visit: &RoomVisit,
        credentials: &RoomCredentials,
        mutation: &QueueMutation,
    ) -> ApiResult<QueuePayload> {
        let backend = &self.context.backend;
        let code = visit.code.as_str();

        match mutation {
            QueueMutation::Refresh => backend.queue(code, credentials).await,
            QueueMutation::Playback(command) => backend.playback(code, credentials, *command).await,
            QueueMutation::Enqueue(track_id) => backend.enqueue(code, credentials, track_id).await,
        }
    }

    /// Fetches the queue once more after a delay, unless the visit ends first.
    /// Failures here are only logged.
    fn schedule_refetch(&self, visit: RoomVisit) {
        let sync = self.clone();
        let delay = self.context.config.refetch_delay();

        tokio::spawn(async move {
            tokio::select! {
                _ = visit.token.cancelled() => {
                    debug!("Refetch for room {} cancelled", visit.code);
                }
                _ = tokio::time::sleep(delay) => {
                    sync.refetch(&visit).await;
                }
            }
        });
    }

    async fn refetch(&self, visit: &RoomVisit) {
        let Some(credentials) = self.context.room_credentials() else {
            info!("Skipping refetch for room {}, no credentials left", visit.code);
            return;
        };

        let result = self
            .send(visit, &credentials, &QueueMutation::Refresh)
            .await;

        match result {
            Ok(payload) => {
                if !self
                    .context
                    .room
                    .dispatch_within(visit, RoomAction::SetQueue(Some(payload)))
                {
                    debug!("Discarding refetch for room {}, it was left", visit.code);
                }
            }
            Err(_) if visit.is_over() => {}
            Err(e) => {
                self.context.forget_rejected_password(&e);
                warn!("Refetch for room {} failed: {}", visit.code, e);
            }
        }
    }
}
