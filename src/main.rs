use std::{sync::Arc, thread};

use colored::{Color, Colorize};
use commands::{Command, HELP};
use log::{error, info, warn};
use queueshare_collab::{Collab, RoomError, SearchDebouncer};
use queueshare_core::{ApiError, Config, FileStorage, MemoryStorage, Storage, StorageError};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::{self, Runtime},
};

mod commands;
mod logging;
mod render;

/// A terminal client for a queueshare room
pub struct Viewer {
    collab: Arc<Collab>,
    search: SearchDebouncer,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum ViewerError {
    #[error("Could not open local storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Could not set up the backend client: {0}")]
    Client(#[from] ApiError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Viewer {
    fn new() -> Result<Self, ViewerError> {
        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("queueshare-async")
            .build()
            .map_err(|e| ViewerError::Fatal(e.to_string()))?;

        let config = Config::from_env();
        info!("Using backend at {}", config.backend_url);

        let storage: Arc<dyn Storage> = match &config.storage_path {
            Some(path) => {
                info!("Keeping local state in {}", path.display());
                Arc::new(FileStorage::open(path)?)
            }
            None => {
                warn!("{} is not set, nothing will be remembered", Config::STORAGE_PATH_VAR);
                Arc::new(MemoryStorage::new())
            }
        };

        let collab = Arc::new(Collab::new(config, storage)?);
        let search = collab.search_box();

        Ok(Self {
            collab,
            search,
            runtime,
        })
    }

    fn run(&self) {
        self.watch();

        self.runtime.block_on(async move {
            self.restore().await;
            println!("{}", "Type help to see what you can do".dimmed());

            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Could not read input: {}", e);
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => self.execute(command).await,
                    Err(e) => println!("{}", e.to_string().yellow()),
                }
            }
        });

        info!("Bye!");
    }

    /// Prints room, search and toast updates as they happen
    fn watch(&self) {
        let rooms = self.collab.rooms.subscribe();
        thread::spawn(move || {
            for room in rooms {
                println!("{}", render::room(&room));
            }
        });

        let searches = self.search.subscribe();
        thread::spawn(move || {
            for state in searches {
                println!("{}", render::search(&state));
            }
        });

        let toasts = self.collab.toasts();
        thread::spawn(move || {
            for toast in toasts {
                println!("{}", render::toast(&toast));
            }
        });
    }

    /// Picks up the session and room from a previous run
    async fn restore(&self) {
        match self.collab.auth.restore_session().await {
            Ok(Some(user)) => info!("Welcome back, {}", user.display_name),
            Ok(None) => {}
            Err(e) => warn!("Could not restore session: {}", e),
        }

        if let Some(Err(e)) = self.collab.rooms.rejoin().await {
            warn!("Could not rejoin room: {}", e);
        }
    }

    async fn execute(&self, command: Command) {
        let collab = &self.collab;
        let sync = &collab.rooms.sync;

        // Backend failures of room calls are toasted, the rest are printed here
        let result: Result<(), String> = match command {
            Command::Login { username, password } => collab
                .auth
                .login(&username, &password)
                .await
                .map(|user| info!("Logged in as {}", user.display_name))
                .map_err(|e| e.to_string()),
            Command::Logout => {
                collab.auth.logout();
                Ok(())
            }
            Command::Join { code, password } => collab
                .rooms
                .join(&code, password.as_deref())
                .await
                .map(|_| ())
                .or_else(untoasted),
            Command::Guest {
                code,
                name,
                password,
            } => collab
                .rooms
                .join_as_guest(&code, &name, &password)
                .await
                .map(|_| ())
                .or_else(untoasted),
            Command::Create { name, password } => collab
                .rooms
                .create(&name, &password)
                .await
                .map(|room| info!("Created room {}, share the code {}", room.name, room.code))
                .or_else(untoasted),
            Command::Delete => collab.rooms.delete().await.or_else(untoasted),
            Command::Leave => {
                collab.rooms.leave();
                Ok(())
            }
            Command::Play => sync.play().await.or_else(untoasted),
            Command::Pause => sync.pause().await.or_else(untoasted),
            Command::Toggle => sync.toggle_playback().await.or_else(untoasted),
            Command::Next => sync.skip_next().await.or_else(untoasted),
            Command::Previous => sync.skip_previous().await.or_else(untoasted),
            Command::Refresh => sync.refresh().await.or_else(untoasted),
            Command::Add(track_id) => sync.enqueue(&track_id).await.or_else(untoasted),
            Command::Search(query) => {
                self.search.input(query);
                Ok(())
            }
            Command::Suggested => collab
                .rooms
                .suggested()
                .await
                .map(|tracks| println!("{}", render::tracks(&tracks)))
                .or_else(untoasted),
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Quit => Ok(()),
        };

        if let Err(message) = result {
            println!("{}", message.color(Color::Yellow));
        }
    }
}

/// Failed backend calls were already shown as a toast
fn untoasted(error: RoomError) -> Result<(), String> {
    match error {
        RoomError::Api(_) => Ok(()),
        other => Err(other.to_string()),
    }
}

impl ViewerError {
    fn hint(&self) -> String {
        match self {
            ViewerError::Storage(_) => format!(
                "Make sure {} points to a writable file, or unset it to keep nothing.",
                Config::STORAGE_PATH_VAR
            ),
            ViewerError::Client(_) => format!(
                "Check that {} is a valid url.",
                Config::BACKEND_URL_VAR
            ),
            ViewerError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Could not set up logging: {}", e);
    }

    match Viewer::new() {
        Ok(viewer) => {
            info!("Initialized successfully.");
            viewer.run();
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "Queueshare failed to start!".bold().color(Color::Red)
            );
            error!("{}", error);
            error!(
                "{}",
                format!("Hint: {}", error.hint()).bright_black().italic()
            );
        }
    }
}
