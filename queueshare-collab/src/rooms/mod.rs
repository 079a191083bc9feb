mod backend;
mod state;
mod sync;

use crossbeam::channel::Receiver;
use log::info;
use queueshare_core::{
    api::RoomsApi, ApiError, RoomCredentials, RoomData, RoomMember, RoomRole, StorageKey, Track,
};
use thiserror::Error;

use crate::{CollabContext, Toast};

pub use backend::*;
pub use state::*;
pub use sync::*;

/// Joins, creates and leaves rooms, and searches within the joined one
pub struct RoomManager {
    context: CollabContext,
    api: RoomsApi,

    pub sync: QueueSync,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Not in a room")]
    NotJoined,
    /// Neither a session nor a guest identity is available for this room
    #[error("No credentials for this room")]
    NoCredentials,
    #[error("You need to be logged in to do that")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl RoomManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            api: RoomsApi::new(&context.client),
            sync: QueueSync::new(context),
        }
    }

    pub fn current(&self) -> Option<Room> {
        self.context.room.state()
    }

    pub fn subscribe(&self) -> Receiver<Option<Room>> {
        self.context.room.subscribe()
    }

    /// Joins a room, then loads its queue.
    /// The password is remembered if the room accepts it.
    pub async fn join(&self, code: &str, password: Option<&str>) -> Result<Room, RoomError> {
        let token = self.context.auth.token();
        let guest_id = self.context.storage.get(StorageKey::RoomGuestId);
        let credentials = RoomCredentials::resolve(token.as_deref(), guest_id.as_deref(), password);

        let data = self
            .api
            .room(code, credentials.as_ref())
            .await
            .map_err(|e| self.reported(e))?;

        // Only hosts get the password back, everyone else keeps the one they typed
        let data = RoomData {
            password: data.password.or_else(|| password.map(str::to_string)),
            ..data
        };

        self.enter(data);

        if let Err(e) = self.sync.refresh().await {
            info!("Joined room {} without a queue: {}", code, e);
        }

        self.current().ok_or(RoomError::NotJoined)
    }

    /// Registers a display name in a room and joins it as a guest
    pub async fn join_as_guest(
        &self,
        code: &str,
        name: &str,
        password: &str,
    ) -> Result<Room, RoomError> {
        let registration = self
            .api
            .register_guest(code, name, password)
            .await
            .map_err(|e| self.reported(e))?;

        self.context
            .storage
            .set(StorageKey::RoomGuestId, &registration.guest_id);
        info!("Registered as guest {} in room {}", name, code);

        self.join(code, Some(password)).await
    }

    /// Rejoins the room stored from a previous run, if any
    pub async fn rejoin(&self) -> Option<Result<Room, RoomError>> {
        let code = self.context.storage.get(StorageKey::RoomCode)?;
        let password = self.context.storage.get(StorageKey::RoomPassword);

        Some(self.join(&code, password.as_deref()).await)
    }

    pub async fn create(&self, name: &str, password: &str) -> Result<Room, RoomError> {
        let token = self.context.auth.token().ok_or(RoomError::NotAuthenticated)?;
        let data = self
            .api
            .create_room(&token, name, password)
            .await
            .map_err(|e| self.toasted(e))?;

        let data = RoomData {
            password: data.password.or_else(|| Some(password.to_string())),
            ..data
        };

        Ok(self.enter(data))
    }

    /// Deletes the joined room, which the user must host
    pub async fn delete(&self) -> Result<(), RoomError> {
        let token = self.context.auth.token().ok_or(RoomError::NotAuthenticated)?;
        let code = self.context.room.code().ok_or(RoomError::NotJoined)?;

        self.api
            .delete_room(&token, &code)
            .await
            .map_err(|e| self.toasted(e))?;
        self.leave();

        Ok(())
    }

    pub fn leave(&self) {
        self.context.room.dispatch(RoomAction::Clear);
    }

    /// Adds a user to the joined room. Errors are returned to the caller, not toasted.
    pub async fn add_member(&self, username: &str, role: RoomRole) -> Result<RoomMember, RoomError> {
        let token = self.context.auth.token().ok_or(RoomError::NotAuthenticated)?;
        let code = self.context.room.code().ok_or(RoomError::NotJoined)?;

        let member = self.api.add_member(&token, &code, username, role).await?;
        info!("Added {} to room {} as {:?}", member.username, code, member.role);

        Ok(member)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Track>, RoomError> {
        let (code, credentials) = self.scope()?;

        self.context
            .backend
            .search(&code, &credentials, query)
            .await
            .map_err(|e| self.reported(e))
    }

    pub async fn suggested(&self) -> Result<Vec<Track>, RoomError> {
        let (code, credentials) = self.scope()?;

        self.context
            .backend
            .suggested(&code, &credentials)
            .await
            .map_err(|e| self.reported(e))
    }

    fn enter(&self, data: RoomData) -> Room {
        let room = Room::from(data.clone());
        self.context.room.dispatch(RoomAction::Join(data));

        room
    }

    fn scope(&self) -> Result<(String, RoomCredentials), RoomError> {
        let code = self.context.room.code().ok_or(RoomError::NotJoined)?;
        let credentials = self
            .context
            .room_credentials()
            .ok_or(RoomError::NoCredentials)?;

        Ok((code, credentials))
    }

    fn reported(&self, error: ApiError) -> RoomError {
        self.context.report(&error);
        RoomError::Api(error)
    }

    /// Like [Self::reported], for calls made with the session alone and no room password
    fn toasted(&self, error: ApiError) -> RoomError {
        self.context.toast(Toast::error(&error));
        RoomError::Api(error)
    }
}

#[cfg(test)]
mod test {
    use queueshare_core::{ApiError, Storage, StorageKey};

    use crate::testing::Harness;
    use crate::RoomError;

    #[tokio::test]
    async fn bearer_wins_over_a_stored_guest() {
        let harness = Harness::new();
        harness.storage.set(StorageKey::RoomGuestId, "guest-1");
        harness.enter_room("ABC", Some("abc123"));

        harness.collab.rooms.search("lofi").await.unwrap();
        assert!(harness.backend.last_credentials().unwrap().is_guest());

        harness.log_in("tok");
        harness.collab.rooms.search("lofi").await.unwrap();

        let credentials = harness.backend.last_credentials().unwrap();
        assert!(!credentials.is_guest());
        assert_eq!(credentials.attached_password(), Some("abc123"));
    }

    #[tokio::test]
    async fn forbidden_search_forgets_the_password() {
        let harness = Harness::new();
        harness.storage.set(StorageKey::RoomGuestId, "guest-1");
        harness.enter_room("ABC", Some("abc123"));
        harness.backend.search_answer(
            "lofi",
            Default::default(),
            Err(ApiError::Http {
                status: 403,
                message: "Wrong room password".into(),
            }),
        );

        let result = harness.collab.rooms.search("lofi").await;

        assert!(matches!(result, Err(RoomError::Api(ref e)) if e.is_forbidden()));
        assert_eq!(harness.storage.get(StorageKey::RoomPassword), None);
        assert_eq!(harness.toast_messages(), vec!["Wrong room password"]);

        // Without the password the guest has no credentials left
        assert!(matches!(
            harness.collab.rooms.search("lofi").await,
            Err(RoomError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn leaving_keeps_the_guest_identity() {
        let harness = Harness::new();
        harness.storage.set(StorageKey::RoomGuestId, "guest-1");
        harness.enter_room("ABC", Some("abc123"));

        harness.collab.rooms.leave();
        harness.collab.rooms.leave();

        assert_eq!(harness.collab.rooms.current(), None);
        assert_eq!(harness.storage.get(StorageKey::RoomCode), None);
        assert_eq!(harness.storage.get(StorageKey::RoomPassword), None);
        assert_eq!(
            harness.storage.get(StorageKey::RoomGuestId).as_deref(),
            Some("guest-1")
        );
    }

    #[tokio::test]
    async fn member_operations_need_a_session() {
        let harness = Harness::new();
        harness.enter_room("ABC", None);

        assert!(matches!(
            harness.collab.rooms.create("Friday", "pw").await,
            Err(RoomError::NotAuthenticated)
        ));
        assert!(matches!(
            harness
                .collab
                .rooms
                .add_member("bob", queueshare_core::RoomRole::Member)
                .await,
            Err(RoomError::NotAuthenticated)
        ));
        assert!(harness.toast_messages().is_empty());
    }

    #[tokio::test]
    async fn suggestions_use_room_credentials() {
        let harness = Harness::new();
        harness.log_in("tok");
        harness.enter_room("ABC", None);

        let tracks = harness.collab.rooms.suggested().await.unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(harness.backend.calls(), vec!["suggested ABC"]);
    }
}
