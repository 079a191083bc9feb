use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam::channel::Receiver;
use log::{info, warn};
use queueshare_core::{
    api::AuthApi, ApiError, LinkedAccount, Storage, StorageExt, StoredSession, UserData,
};
use thiserror::Error;

use crate::{
    store::{Reducer, StateStore},
    CollabContext, RoomAction, Toast,
};

/// A bearer session issued by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub access_token_expiry: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.access_token_expiry <= Utc::now()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub loading: bool,
    /// The last error, shown inline next to the login form
    pub error: Option<String>,
    pub session: Option<Session>,
    pub user: Option<UserData>,
}

#[derive(Debug, Clone)]
pub enum AuthAction {
    Started,
    LoggedIn {
        token: String,
        expires_at: DateTime<Utc>,
    },
    UserLoaded(UserData),
    Failed(String),
    AccountLinked(LinkedAccount),
    AccountUnlinked,
    LoggedOut,
}

pub struct AuthReducer;

impl Reducer for AuthReducer {
    type State = AuthState;
    type Action = AuthAction;

    fn reduce(state: AuthState, action: AuthAction) -> AuthState {
        match action {
            AuthAction::Started => AuthState {
                loading: true,
                error: None,
                ..state
            },
            AuthAction::LoggedIn { token, expires_at } => AuthState {
                error: None,
                session: Some(Session {
                    access_token: token,
                    access_token_expiry: expires_at,
                }),
                ..state
            },
            AuthAction::UserLoaded(user) => AuthState {
                loading: false,
                user: Some(user),
                ..state
            },
            AuthAction::Failed(message) => AuthState {
                loading: false,
                error: Some(message),
                ..state
            },
            AuthAction::AccountLinked(account) => AuthState {
                user: state.user.map(|user| UserData {
                    spotify: Some(account),
                    ..user
                }),
                ..state
            },
            AuthAction::AccountUnlinked => AuthState {
                user: state.user.map(|user| UserData {
                    spotify: None,
                    ..user
                }),
                ..state
            },
            AuthAction::LoggedOut => AuthState::default(),
        }
    }
}

/// The auth state container, persisting the session as it changes
pub struct AuthStore {
    state: StateStore<AuthReducer>,
    storage: Arc<dyn Storage>,
}

impl AuthStore {
    /// Creates the container from a stored session. An expired session is discarded.
    pub fn restore(storage: &Arc<dyn Storage>) -> Self {
        let session = match storage.read_session() {
            Some(StoredSession { token, expires_at }) if expires_at > Utc::now() => {
                info!("Restored session expiring at {}", expires_at);
                Some(Session {
                    access_token: token,
                    access_token_expiry: expires_at,
                })
            }
            _ => {
                if storage.clear_session() > 0 {
                    info!("Discarded stored session, it has expired");
                }
                None
            }
        };

        Self {
            state: StateStore::new(AuthState {
                session,
                ..Default::default()
            }),
            storage: storage.clone(),
        }
    }

    pub fn dispatch(&self, action: AuthAction) -> AuthState {
        match &action {
            AuthAction::LoggedIn { token, expires_at } => {
                self.storage.write_session(&StoredSession {
                    token: token.clone(),
                    expires_at: *expires_at,
                });
            }
            AuthAction::LoggedOut => {
                self.storage.clear_session();
            }
            _ => {}
        }

        self.state.dispatch(action)
    }

    pub fn state(&self) -> AuthState {
        self.state.state()
    }

    pub fn subscribe(&self) -> Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.read(|state| state.session.clone())
    }

    /// The bearer token, unless it has expired
    pub fn token(&self) -> Option<String> {
        self.session()
            .filter(|session| !session.is_expired())
            .map(|session| session.access_token)
    }

    pub fn user(&self) -> Option<UserData> {
        self.state.read(|state| state.user.clone())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("That username is already taken")]
    UsernameTaken,
    #[error("You need to be logged in to do that")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Logs users in and out, creates accounts and links external ones
pub struct AuthManager {
    context: CollabContext,
    api: AuthApi,
}

impl AuthManager {
    const SPOTIFY_CALLBACK_PATH: &'static str = "/spotify/callback";

    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            api: AuthApi::new(&context.client),
        }
    }

    pub fn state(&self) -> AuthState {
        self.context.auth.state()
    }

    pub fn subscribe(&self) -> Receiver<AuthState> {
        self.context.auth.subscribe()
    }

    /// Logs in and loads the user. Errors are returned, not toasted.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserData, AuthError> {
        self.context.auth.dispatch(AuthAction::Started);

        let token = self
            .api
            .token(username, password)
            .await
            .map_err(|e| match e.status() {
                Some(400 | 401) => AuthError::InvalidCredentials,
                _ => AuthError::Api(e),
            })
            .map_err(|e| self.failed(e))?;

        self.context.auth.dispatch(AuthAction::LoggedIn {
            token: token.token,
            expires_at: token.expires_at,
        });
        info!("Logged in as {}", username);

        self.refresh_user().await
    }

    /// Creates an account and logs into it
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserData, AuthError> {
        self.context.auth.dispatch(AuthAction::Started);

        self.api
            .create_user(username, password, display_name)
            .await
            .map_err(|e| match e.is_conflict() {
                true => AuthError::UsernameTaken,
                false => AuthError::Api(e),
            })
            .map_err(|e| self.failed(e))?;

        info!("Created account {}", username);
        self.login(username, password).await
    }

    /// Loads the current user. A rejected token logs the user out.
    pub async fn refresh_user(&self) -> Result<UserData, AuthError> {
        let token = self.context.auth.token().ok_or(AuthError::NotAuthenticated)?;

        match self.api.user(&token).await {
            Ok(user) => {
                self.context.auth.dispatch(AuthAction::UserLoaded(user.clone()));
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    warn!("Stored token was rejected, logging out");
                    self.context.auth.dispatch(AuthAction::LoggedOut);
                }

                Err(self.failed(AuthError::Api(e)))
            }
        }
    }

    /// Loads the user of a restored session, if there is one
    pub async fn restore_session(&self) -> Result<Option<UserData>, AuthError> {
        if self.context.auth.token().is_none() {
            return Ok(None);
        }

        self.refresh_user().await.map(Some)
    }

    /// Where to send the browser to link a Spotify account
    pub fn spotify_link_url(&self) -> Result<String, AuthError> {
        let redirect_uri = self.redirect_uri();
        Ok(self.api.spotify_authorize_url(&redirect_uri)?)
    }

    /// Finishes linking with the code handed to the callback page
    pub async fn complete_spotify_link(&self, code: &str) -> Result<LinkedAccount, AuthError> {
        let token = self.context.auth.token().ok_or(AuthError::NotAuthenticated)?;

        let account = self
            .api
            .link_spotify(&token, code, &self.redirect_uri())
            .await
            .map_err(|e| self.toasted(e))?;

        self.context
            .auth
            .dispatch(AuthAction::AccountLinked(account.clone()));
        self.context
            .toast(Toast::info(format!("Linked Spotify account {}", account.name)));

        Ok(account)
    }

    pub async fn unlink_spotify(&self) -> Result<(), AuthError> {
        let token = self.context.auth.token().ok_or(AuthError::NotAuthenticated)?;

        self.api
            .unlink_spotify(&token)
            .await
            .map_err(|e| self.toasted(e))?;

        self.context.auth.dispatch(AuthAction::AccountUnlinked);
        Ok(())
    }

    /// Forgets the session and leaves the joined room
    pub fn logout(&self) {
        self.context.auth.dispatch(AuthAction::LoggedOut);
        self.context.room.dispatch(RoomAction::Clear);

        info!("Logged out");
    }

    fn redirect_uri(&self) -> String {
        self.context
            .config
            .frontend_path(Self::SPOTIFY_CALLBACK_PATH)
    }

    fn failed(&self, error: AuthError) -> AuthError {
        self.context
            .auth
            .dispatch(AuthAction::Failed(error.to_string()));
        error
    }

    fn toasted(&self, error: ApiError) -> AuthError {
        self.context.toast(Toast::error(&error));
        AuthError::Api(error)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use queueshare_core::{LinkedAccount, MemoryStorage, Storage, StorageExt, StorageKey, UserData};

    use super::{AuthAction, AuthReducer, AuthStore};
    use crate::{store::Reducer, testing::Harness};

    fn user() -> UserData {
        UserData {
            id: "u1".into(),
            username: "mary".into(),
            display_name: "Mary".into(),
            spotify: None,
        }
    }

    #[test]
    fn persisted_session_is_restored() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let expires_at = Utc::now() + Duration::days(3);

        let store = AuthStore::restore(&storage);
        store.dispatch(AuthAction::LoggedIn {
            token: "tok".into(),
            expires_at,
        });

        let restored = AuthStore::restore(&storage);
        let session = restored.session().unwrap();

        assert_eq!(session.access_token, "tok");
        // Stored as RFC 3339, which keeps sub-second precision
        assert_eq!(session.access_token_expiry, expires_at);
        assert_eq!(restored.token().as_deref(), Some("tok"));
    }

    #[test]
    fn expired_session_is_discarded() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn Storage> = memory.clone();

        storage.write_session(&queueshare_core::StoredSession {
            token: "old".into(),
            expires_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        });

        let store = AuthStore::restore(&storage);

        assert_eq!(store.session(), None);
        assert!(memory.is_empty());
    }

    #[test]
    fn logout_forgets_the_session() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn Storage> = memory.clone();
        let store = AuthStore::restore(&storage);

        store.dispatch(AuthAction::LoggedIn {
            token: "tok".into(),
            expires_at: Utc::now() + Duration::days(1),
        });
        assert_eq!(memory.get(StorageKey::Token).as_deref(), Some("tok"));

        let state = store.dispatch(AuthAction::LoggedOut);

        assert_eq!(state, Default::default());
        assert_eq!(memory.get(StorageKey::Token), None);
        assert_eq!(memory.get(StorageKey::TokenExpiry), None);
    }

    #[test]
    fn linking_needs_a_loaded_user() {
        let account = LinkedAccount {
            name: "mary_s".into(),
            image: None,
        };

        let state = AuthReducer::reduce(Default::default(), AuthAction::AccountLinked(account.clone()));
        assert_eq!(state.user, None);

        let state = AuthReducer::reduce(state, AuthAction::UserLoaded(user()));
        let state = AuthReducer::reduce(state, AuthAction::AccountLinked(account.clone()));
        assert_eq!(state.user.as_ref().unwrap().spotify, Some(account));

        let state = AuthReducer::reduce(state, AuthAction::AccountUnlinked);
        assert_eq!(state.user.unwrap().spotify, None);
    }

    #[test]
    fn failure_stops_loading() {
        let state = AuthReducer::reduce(Default::default(), AuthAction::Started);
        assert!(state.loading);

        let state = AuthReducer::reduce(state, AuthAction::Failed("nope".into()));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("nope"));

        let state = AuthReducer::reduce(state, AuthAction::Started);
        assert_eq!(state.error, None);
    }

    #[test]
    fn logout_leaves_the_room() {
        let harness = Harness::new();
        harness.log_in("tok");
        harness.enter_room("ABC", Some("abc123"));

        harness.collab.auth.logout();

        assert_eq!(harness.collab.context().auth.token(), None);
        assert_eq!(harness.collab.rooms.current(), None);
        assert!(harness.storage.is_empty());
    }

    #[test]
    fn link_url_points_back_to_the_frontend() {
        let harness = Harness::new();
        let url = harness.collab.auth.spotify_link_url().unwrap();

        assert!(url.starts_with("http://localhost:8000/spotify/authorize?redirect_uri="));
        assert!(url.ends_with("http%3A%2F%2Flocalhost%3A3000%2Fspotify%2Fcallback"));
    }
}
