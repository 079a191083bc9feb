use std::{env, fmt::Display};

use colored::Colorize;
use log::{Level, LevelFilter, SetLoggerError};

/// Raises or lowers how much the queueshare crates log, like `debug` or `warn`
pub const LOG_LEVEL_VAR: &str = "QUEUESHARE_LOG";

const LOCAL_CRATES: [&str; 3] = ["queueshare", "queueshare_collab", "queueshare_core"];

/// Logs to standard error, which leaves standard output to the viewer.
/// Other crates only get through with warnings and errors.
pub fn init_logger() -> Result<(), SetLoggerError> {
    let local = local_level(env::var(LOG_LEVEL_VAR).ok().as_deref());

    LOCAL_CRATES
        .iter()
        .fold(
            fern::Dispatch::new().level(LevelFilter::Warn),
            |dispatch, name| dispatch.level_for(*name, local),
        )
        .format(|out, message, record| {
            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                badge(record.level()),
                chrono::Local::now().format("%H:%M:%S").to_string().bright_black(),
                Tag::of(record.target()),
                message
            ))
        })
        .chain(std::io::stderr())
        .apply()
}

fn local_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Which part of the client a record came from
#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Viewer,
    Collab,
    Core,
    Other(&'a str),
}

impl<'a> Tag<'a> {
    fn of(target: &'a str) -> Self {
        match target.split("::").next().unwrap_or_default() {
            "queueshare" => Self::Viewer,
            "queueshare_collab" => Self::Collab,
            "queueshare_core" => Self::Core,
            other => Self::Other(other),
        }
    }
}

impl Display for Tag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Tag::Viewer => "VIEWER".bright_green(),
            Tag::Collab => "COLLAB".bright_purple(),
            Tag::Core => "CORE".blue(),
            Tag::Other(name) => name.dimmed(),
        };

        Display::fmt(&tag, f)
    }
}

fn badge(level: Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
