use std::str::FromStr;

use thiserror::Error;

/// A line typed into the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Join { code: String, password: Option<String> },
    Guest { code: String, name: String, password: String },
    Create { name: String, password: String },
    Delete,
    Leave,
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Refresh,
    Search(String),
    Suggested,
    Add(String),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command {0}, type help to see what's available")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("login", [username, password]) => Self::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ("login", _) => return Err(CommandError::Usage("login <username> <password>")),
            ("logout", []) => Self::Logout,
            ("join", [code]) => Self::Join {
                code: code.to_string(),
                password: None,
            },
            ("join", [code, password]) => Self::Join {
                code: code.to_string(),
                password: Some(password.to_string()),
            },
            ("join", _) => return Err(CommandError::Usage("join <code> [password]")),
            ("guest", [code, name, password]) => Self::Guest {
                code: code.to_string(),
                name: name.to_string(),
                password: password.to_string(),
            },
            ("guest", _) => return Err(CommandError::Usage("guest <code> <name> <password>")),
            ("create", [name, password]) => Self::Create {
                name: name.to_string(),
                password: password.to_string(),
            },
            ("create", _) => return Err(CommandError::Usage("create <name> <password>")),
            ("delete", []) => Self::Delete,
            ("leave", []) => Self::Leave,
            ("play", []) => Self::Play,
            ("pause", []) => Self::Pause,
            ("toggle" | "p", []) => Self::Toggle,
            ("next" | "n", []) => Self::Next,
            ("prev" | "previous", []) => Self::Previous,
            ("refresh" | "r", []) => Self::Refresh,
            ("search" | "s", []) => return Err(CommandError::Usage("search <query>")),
            ("search" | "s", query) => Self::Search(query.join(" ")),
            ("suggested", []) => Self::Suggested,
            ("add", [track_id]) => Self::Add(track_id.to_string()),
            ("add", _) => return Err(CommandError::Usage("add <track id>")),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

pub const HELP: &str = "\
login <username> <password>     log in
logout                          log out and leave the room
join <code> [password]          join a room
guest <code> <name> <password>  join a room as a guest
create <name> <password>        create a room and join it
delete                          delete the room you host
leave                           leave the room
play, pause, toggle             control playback
next, prev                      skip around the queue
refresh                         fetch the queue again
search <query>                  search for tracks to add
suggested                       show suggested tracks
add <track id>                  add a track to the queue
quit                            exit";
