use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single track, as returned by search and queue endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_art: Option<String>,
    /// The display name of whoever put this track in the queue
    pub added_by: Option<String>,
}

/// The track the room is currently playing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    #[serde(flatten)]
    pub track: Track,
    #[serde(default)]
    pub paused: bool,
}

/// The authoritative playback state returned by every queue endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePayload {
    #[serde(default)]
    pub currently_playing: Option<NowPlaying>,
    #[serde(default)]
    pub queue: Option<Vec<Track>>,
}

/// The role of the current user in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Host,
    Moderator,
    Member,
    Guest,
}

impl RoomRole {
    /// Whether this role may control playback for everyone
    pub fn controls_playback(&self) -> bool {
        matches!(self, Self::Host | Self::Moderator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHost {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub spotify_name: Option<String>,
}

/// A room, as returned when fetching or creating one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    pub name: String,
    pub code: String,
    pub host: RoomHost,
    pub role: RoomRole,
    #[serde(default)]
    pub guest_name: Option<String>,
    /// Only present for the host and members who know it
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRoom<'a> {
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestRegistration {
    pub guest_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub username: String,
    pub role: RoomRole,
}

/// A bearer session issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// An external account linked to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A queueshare account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub spotify: Option<LinkedAccount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    Tracks,
    Artists,
    Albums,
}

impl RankingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracks => "tracks",
            Self::Artists => "artists",
            Self::Albums => "albums",
        }
    }
}

/// The window a ranking is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPeriod {
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year { year: i32 },
}

impl RankingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week { .. } => "week",
            Self::Month { .. } => "month",
            Self::Year { .. } => "year",
        }
    }

    /// The query parameters identifying this period
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match *self {
            Self::Week { year, week } => vec![("year", year.to_string()), ("week", week.to_string())],
            Self::Month { year, month } => {
                vec![("year", year.to_string()), ("month", month.to_string())]
            }
            Self::Year { year } => vec![("year", year.to_string())],
        }
    }
}

/// A single entry in a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub position: u32,
    /// The position in the previous period, if it was ranked at all
    #[serde(default)]
    pub previous_position: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub streams: u32,
}

/// How many streams happened on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStreams {
    pub date: NaiveDate,
    pub count: u32,
}

/// Rankings of two users side by side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendComparison {
    pub friend: String,
    pub mine: Vec<Ranking>,
    pub theirs: Vec<Ranking>,
}

impl FriendComparison {
    /// Names ranked by both users, in my order
    pub fn shared(&self) -> Vec<&str> {
        self.mine
            .iter()
            .filter(|m| self.theirs.iter().any(|t| t.name == m.name))
            .map(|m| m.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn queue_payload_with_minimal_tracks() {
        let payload: QueuePayload = serde_json::from_value(json!({
            "currently_playing": { "id": "t1", "paused": false },
            "queue": [{ "id": "t2" }]
        }))
        .unwrap();

        let playing = payload.currently_playing.unwrap();
        assert_eq!(playing.track.id, "t1");
        assert!(!playing.paused);
        assert_eq!(payload.queue.unwrap()[0].id, "t2");
    }

    #[test]
    fn queue_payload_may_omit_everything() {
        let payload: QueuePayload = serde_json::from_value(json!({})).unwrap();

        assert_eq!(payload, QueuePayload::default());
    }

    #[test]
    fn room_roles_are_lowercase() {
        let room: RoomData = serde_json::from_value(json!({
            "name": "Friday",
            "code": "FRI123",
            "host": { "id": "u1", "username": "mary" },
            "role": "moderator"
        }))
        .unwrap();

        assert_eq!(room.role, RoomRole::Moderator);
        assert!(room.role.controls_playback());
        assert!(!RoomRole::Guest.controls_playback());
        assert_eq!(room.password, None);
    }

    #[test]
    fn shared_rankings() {
        let ranking = |name: &str, position| Ranking {
            position,
            previous_position: None,
            name: name.into(),
            artists: vec![],
            image: None,
            streams: 1,
        };

        let comparison = FriendComparison {
            friend: "john".into(),
            mine: vec![ranking("a", 1), ranking("b", 2), ranking("c", 3)],
            theirs: vec![ranking("c", 1), ranking("a", 2)],
        };

        assert_eq!(comparison.shared(), vec!["a", "c"]);
    }
}
