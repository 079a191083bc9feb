use std::fmt::Write;

use colored::Colorize;
use queueshare_collab::{Room, SearchState, Toast, ToastLevel};
use queueshare_core::Track;

pub fn room(room: &Option<Room>) -> String {
    let Some(room) = room else {
        return "Not in a room".dimmed().to_string();
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} hosted by {} ({:?})",
        room.name.bold(),
        format!("[{}]", room.code).bright_black(),
        room.host.display_name.as_deref().unwrap_or(&room.host.username),
        room.role
    );

    let Some(queue) = &room.queue else {
        let _ = write!(out, "{}", "Nothing is playing".dimmed());
        return out;
    };

    let (played, up_next) = queue.played_and_up_next();

    for played in played {
        let _ = writeln!(out, "  {}", track(played).dimmed());
    }

    match &queue.currently_playing {
        Some(playing) => {
            let state = if playing.paused { "||" } else { ">" };
            let _ = writeln!(out, "{} {}", state.green().bold(), track(&playing.track).bold());
        }
        None => {
            let _ = writeln!(out, "{}", "Nothing is playing".dimmed());
        }
    }

    for next in up_next {
        let _ = writeln!(out, "  {}", track(next));
    }

    out.trim_end().to_string()
}

pub fn search(state: &SearchState) -> String {
    if state.loading {
        return format!("Searching for {}...", state.query).dimmed().to_string();
    }

    tracks(&state.results)
}

pub fn tracks(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return "No tracks found".dimmed().to_string();
    }

    tracks
        .iter()
        .map(|t| format!("{} {}", t.id.bright_black(), track(t)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn toast(toast: &Toast) -> String {
    match toast.level {
        ToastLevel::Info => format!("{} {}", "i".blue().bold(), toast.message),
        ToastLevel::Error => format!("{} {}", "!".red().bold(), toast.message.red()),
    }
}

fn track(track: &Track) -> String {
    let mut line = format!("{} - {}", track.name, track.artists.join(", "));

    if let Some(added_by) = &track.added_by {
        let _ = write!(line, " (added by {})", added_by);
    }

    line
}
