mod auth;
mod events;
mod rooms;
mod search;
mod stats;
mod store;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crossbeam::channel::unbounded;
use log::{debug, info};
use queueshare_core::{
    api::RoomsApi, ApiClient, ApiError, ApiResult, Config, RoomCredentials, Storage, StorageKey,
};

pub use auth::*;
pub use events::*;
pub use rooms::*;
pub use search::*;
pub use stats::*;
pub use store::*;

/// The queueshare client, tying authentication, rooms, playback and statistics together.
pub struct Collab {
    context: CollabContext,
    toast_receiver: ToastReceiver,

    pub auth: AuthManager,
    pub rooms: RoomManager,
    pub stats: StatsBoard,
}

/// A type passed to the components of the client, to access shared state and report to the user.
#[derive(Clone)]
pub struct CollabContext {
    pub config: Config,
    pub client: ApiClient,
    pub storage: Arc<dyn Storage>,
    pub backend: Arc<dyn RoomBackend>,

    pub auth: Arc<AuthStore>,
    pub room: Arc<RoomStore>,

    toast_sender: ToastSender,
}

impl Collab {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> ApiResult<Self> {
        let client = ApiClient::new(&config)?;
        let backend = Arc::new(RoomsApi::new(&client));

        Ok(Self::with_backend(config, client, storage, backend))
    }

    /// Creates the client with a custom implementation of the room-scoped calls
    pub fn with_backend(
        config: Config,
        client: ApiClient,
        storage: Arc<dyn Storage>,
        backend: Arc<dyn RoomBackend>,
    ) -> Self {
        let (toast_sender, toast_receiver) = unbounded();

        let context = CollabContext {
            auth: Arc::new(AuthStore::restore(&storage)),
            room: Arc::new(RoomStore::new(&storage)),
            config,
            client,
            storage,
            backend,
            toast_sender,
        };

        Self {
            auth: AuthManager::new(&context),
            rooms: RoomManager::new(&context),
            stats: StatsBoard::new(&context),
            context,
            toast_receiver,
        }
    }

    pub fn context(&self) -> &CollabContext {
        &self.context
    }

    /// Receives the notifications meant for the user
    pub fn toasts(&self) -> ToastReceiver {
        self.toast_receiver.clone()
    }

    /// Creates a debounced search input for the joined room
    pub fn search_box(&self) -> SearchDebouncer {
        SearchDebouncer::new(&self.context)
    }
}

impl CollabContext {
    pub fn toast(&self, toast: Toast) {
        if self.toast_sender.send(toast).is_err() {
            debug!("Toast dropped, nobody is listening");
        }
    }

    /// Resolves the credentials for room-scoped calls from the current session and
    /// the stored guest identity. Resolved on every call so a login takes effect immediately.
    pub fn room_credentials(&self) -> Option<RoomCredentials> {
        let token = self.auth.token();
        let guest_id = self.storage.get(StorageKey::RoomGuestId);
        let password = self.storage.get(StorageKey::RoomPassword);

        RoomCredentials::resolve(token.as_deref(), guest_id.as_deref(), password.as_deref())
    }

    /// Surfaces a failed room-scoped call to the user
    pub fn report(&self, error: &ApiError) {
        self.forget_rejected_password(error);
        self.toast(Toast::error(error));
    }

    /// A stored room password the server refuses is stale, so it is dropped
    pub fn forget_rejected_password(&self, error: &ApiError) {
        if error.is_forbidden() && self.storage.remove(StorageKey::RoomPassword) {
            info!("Room password was rejected, forgetting it");
        }
    }
}
