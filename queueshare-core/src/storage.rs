use std::{
    collections::HashMap,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every value the client keeps across restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKey {
    /// Written together with [StorageKey::TokenExpiry]
    Token,
    TokenExpiry,
    /// Written together with [StorageKey::RoomPassword]
    RoomCode,
    RoomPassword,
    RoomGuestId,
    LastSearch,
    LastSearchResults,
}

impl StorageKey {
    pub const ALL: [StorageKey; 7] = [
        Self::Token,
        Self::TokenExpiry,
        Self::RoomCode,
        Self::RoomPassword,
        Self::RoomGuestId,
        Self::LastSearch,
        Self::LastSearchResults,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::TokenExpiry => "token_expiry",
            Self::RoomCode => "room_code",
            Self::RoomPassword => "room_password",
            Self::RoomGuestId => "room_guest_id",
            Self::LastSearch => "last_search",
            Self::LastSearchResults => "last_search_results",
        }
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },
    #[error("Could not write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

/// A string key-value store over a closed set of keys
pub trait Storage: Send + Sync {
    fn get(&self, key: StorageKey) -> Option<String>;
    fn set(&self, key: StorageKey, value: &str);
    /// Removes a key, returning whether it was present
    fn remove(&self, key: StorageKey) -> bool;

    /// Writes several keys as one change
    fn set_many(&self, entries: &[(StorageKey, &str)]) {
        for (key, value) in entries {
            self.set(*key, value);
        }
    }

    /// Removes several keys as one change, returning how many were present
    fn remove_many(&self, keys: &[StorageKey]) -> usize {
        keys.iter().filter(|key| self.remove(**key)).count()
    }
}

/// A stored bearer session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The identity needed to silently rejoin a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoomAccess {
    pub code: String,
    pub password: Option<String>,
    pub guest_id: Option<String>,
}

/// Grouped reads and writes that keep related keys consistent
pub trait StorageExt: Storage {
    fn write_session(&self, session: &StoredSession) {
        let expiry = session.expires_at.to_rfc3339();
        self.set_many(&[
            (StorageKey::Token, session.token.as_str()),
            (StorageKey::TokenExpiry, expiry.as_str()),
        ]);
    }

    /// Returns the stored session if both halves are present and readable
    fn read_session(&self) -> Option<StoredSession> {
        let token = self.get(StorageKey::Token)?;
        let expiry = self.get(StorageKey::TokenExpiry)?;

        match DateTime::parse_from_rfc3339(&expiry) {
            Ok(expires_at) => Some(StoredSession {
                token,
                expires_at: expires_at.with_timezone(&Utc),
            }),
            Err(e) => {
                warn!("Discarding stored token with unreadable expiry {}: {}", expiry, e);
                None
            }
        }
    }

    fn clear_session(&self) -> usize {
        self.remove_many(&[StorageKey::Token, StorageKey::TokenExpiry])
    }

    fn write_room_access(&self, code: &str, password: Option<&str>) {
        match password {
            Some(password) => self.set_many(&[
                (StorageKey::RoomCode, code),
                (StorageKey::RoomPassword, password),
            ]),
            None => {
                self.set(StorageKey::RoomCode, code);
                self.remove(StorageKey::RoomPassword);
            }
        }
    }

    fn read_room_access(&self) -> Option<StoredRoomAccess> {
        Some(StoredRoomAccess {
            code: self.get(StorageKey::RoomCode)?,
            password: self.get(StorageKey::RoomPassword),
            guest_id: self.get(StorageKey::RoomGuestId),
        })
    }

    fn clear_room_access(&self) -> usize {
        self.remove_many(&[StorageKey::RoomCode, StorageKey::RoomPassword])
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        self.values.lock().insert(key, value.to_string());
    }

    fn remove(&self, key: StorageKey) -> bool {
        self.values.lock().remove(&key).is_some()
    }
}

/// Storage backed by a JSON file, written through on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<HashMap<StorageKey, String>>,
}

impl FileStorage {
    /// Opens the file at the path, starting empty if it doesn't exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| StorageError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?;

            serde_json::from_str(&text).map_err(|e| StorageError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            HashMap::new()
        };

        debug!("Opened storage at {}", path.display());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<StorageKey, String>) -> Result<(), StorageError> {
        let error = |e: String| StorageError::Write {
            path: self.path.clone(),
            reason: e,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| error(e.to_string()))?;
        }

        let text = serde_json::to_string_pretty(values).map_err(|e| error(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| error(e.to_string()))
    }

    fn change<F>(&self, apply: F)
    where
        F: FnOnce(&mut HashMap<StorageKey, String>) -> bool,
    {
        let mut values = self.values.lock();

        if !apply(&mut *values) {
            return;
        }

        // The in-memory copy stays authoritative for this process
        if let Err(e) = self.flush(&values) {
            warn!("{}", e);
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        self.change(|values| {
            values.insert(key, value.to_string());
            true
        })
    }

    fn remove(&self, key: StorageKey) -> bool {
        let mut removed = false;

        self.change(|values| {
            removed = values.remove(&key).is_some();
            removed
        });

        removed
    }

    fn set_many(&self, entries: &[(StorageKey, &str)]) {
        self.change(|values| {
            for (key, value) in entries {
                values.insert(*key, value.to_string());
            }
            true
        })
    }

    fn remove_many(&self, keys: &[StorageKey]) -> usize {
        let mut removed = 0;

        self.change(|values| {
            removed = keys.iter().filter(|k| values.remove(k).is_some()).count();
            removed > 0
        });

        removed
    }
}

#[cfg(test)]
mod test {
    use std::env;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("queueshare-{}-{}.json", name, std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn session_round_trip() {
        let storage = MemoryStorage::new();
        let session = StoredSession {
            token: "abc".into(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        };

        storage.write_session(&session);

        assert_eq!(storage.read_session(), Some(session));
        assert_eq!(storage.clear_session(), 2);
        assert_eq!(storage.clear_session(), 0);
        assert_eq!(storage.read_session(), None);
    }

    #[test]
    fn half_a_session_is_no_session() {
        let storage = MemoryStorage::new();
        storage.set(StorageKey::Token, "abc");

        assert_eq!(storage.read_session(), None);

        storage.set(StorageKey::TokenExpiry, "not a date");
        assert_eq!(storage.read_session(), None);
    }

    #[test]
    fn room_access_without_password_drops_stale_password() {
        let storage = MemoryStorage::new();

        storage.write_room_access("ROOM1", Some("abc123"));
        storage.write_room_access("ROOM2", None);

        assert_eq!(
            storage.read_room_access(),
            Some(StoredRoomAccess {
                code: "ROOM2".into(),
                password: None,
                guest_id: None,
            })
        );
    }

    #[test]
    fn file_storage_persists_across_opens() {
        let path = temp_path("persist");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.write_room_access("ROOM1", Some("abc123"));
            storage.set(StorageKey::RoomGuestId, "guest-1");
        }

        let storage = FileStorage::open(&path).unwrap();

        assert_eq!(storage.get(StorageKey::RoomPassword).as_deref(), Some("abc123"));
        assert_eq!(storage.get(StorageKey::RoomGuestId).as_deref(), Some("guest-1"));
        assert_eq!(storage.clear_room_access(), 2);

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get(StorageKey::RoomCode), None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let path = temp_path("garbage");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileStorage::open(&path),
            Err(StorageError::Read { .. })
        ));

        let _ = fs::remove_file(&path);
    }
}
