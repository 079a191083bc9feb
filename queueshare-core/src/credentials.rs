/// The header a room password travels in when a bearer token is used
pub const ROOM_PASSWORD_HEADER: &str = "X-Room-Password";

/// How a single request is authorized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestAuth {
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: Basic base64(id:secret)`
    Basic { id: String, secret: String },
}

/// Credentials for calls scoped to a room
#[derive(Clone, PartialEq, Eq)]
pub enum RoomCredentials {
    /// A logged in user. The room password may be attached so the server can
    /// resolve moderator permissions, but it is never required.
    Token {
        token: String,
        room_password: Option<String>,
    },
    /// A guest registered in the room, authenticated with the room password
    Guest {
        guest_id: String,
        room_password: String,
    },
}

impl RoomCredentials {
    /// Picks the credentials for a room-scoped call.
    /// A bearer token always wins over a stored guest identity.
    pub fn resolve(
        token: Option<&str>,
        guest_id: Option<&str>,
        room_password: Option<&str>,
    ) -> Option<Self> {
        if let Some(token) = token {
            return Some(Self::Token {
                token: token.to_string(),
                room_password: room_password.map(str::to_string),
            });
        }

        match (guest_id, room_password) {
            (Some(guest_id), Some(room_password)) => Some(Self::Guest {
                guest_id: guest_id.to_string(),
                room_password: room_password.to_string(),
            }),
            _ => None,
        }
    }

    /// The scheme that goes into the `Authorization` header
    pub fn auth(&self) -> RequestAuth {
        match self {
            Self::Token { token, .. } => RequestAuth::Bearer(token.clone()),
            Self::Guest {
                guest_id,
                room_password,
            } => RequestAuth::Basic {
                id: guest_id.clone(),
                secret: room_password.clone(),
            },
        }
    }

    /// The room password to send alongside a bearer token, if any
    pub fn attached_password(&self) -> Option<&str> {
        match self {
            Self::Token { room_password, .. } => room_password.as_deref(),
            Self::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for RoomCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token { room_password, .. } => f
                .debug_struct("Token")
                .field("room_password", &room_password.as_ref().map(|_| "***"))
                .finish_non_exhaustive(),
            Self::Guest { guest_id, .. } => f
                .debug_struct("Guest")
                .field("guest_id", guest_id)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{RequestAuth, RoomCredentials};

    #[test]
    fn token_takes_precedence_over_guest() {
        let credentials = RoomCredentials::resolve(Some("tok"), Some("guest-1"), Some("abc123"));

        assert_eq!(
            credentials,
            Some(RoomCredentials::Token {
                token: "tok".into(),
                room_password: Some("abc123".into())
            })
        );
        assert_eq!(
            credentials.map(|c| c.auth()),
            Some(RequestAuth::Bearer("tok".into()))
        );
    }

    #[test]
    fn token_without_password() {
        let credentials = RoomCredentials::resolve(Some("tok"), None, None).unwrap();

        assert_eq!(credentials.attached_password(), None);
        assert!(!credentials.is_guest());
    }

    #[test]
    fn guest_needs_id_and_password() {
        assert_eq!(RoomCredentials::resolve(None, Some("guest-1"), None), None);
        assert_eq!(RoomCredentials::resolve(None, None, Some("abc123")), None);
        assert_eq!(RoomCredentials::resolve(None, None, None), None);

        let credentials = RoomCredentials::resolve(None, Some("guest-1"), Some("abc123")).unwrap();

        assert_eq!(
            credentials.auth(),
            RequestAuth::Basic {
                id: "guest-1".into(),
                secret: "abc123".into()
            }
        );
        assert_eq!(credentials.attached_password(), None);
    }

    #[test]
    fn debug_hides_secrets() {
        let credentials = RoomCredentials::resolve(Some("secret-token"), None, Some("pw")).unwrap();
        let printed = format!("{:?}", credentials);

        assert!(!printed.contains("secret-token"));
        assert!(!printed.contains("pw\""));
    }
}
