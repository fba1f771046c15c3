//! Line commands understood by the terminal front end

use crate::error::{CliError, Result};
use playhead_playback::{PlaybackController, Player, Song, TransportControlFlags};
use std::fmt::Write as _;
use std::time::Duration;

pub const HELP: &str = "\
commands:
  enqueue <uri> [title]   append a song
  play [uri] [ms]         resume, or play a song from an offset
  pause | stop
  seek <ms>
  skip | back
  skipto <n>              move n entries from now playing
  remove <n>              remove the nth entry (1-based)
  empty                   clear the queue
  flags <bits>            set transport control flags
  status | queue | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Enqueue { uri: String, title: Option<String> },
    Play,
    PlayFrom(Duration),
    PlaySong { uri: String, start: Option<Duration> },
    Pause,
    Stop,
    Seek(Duration),
    Skip,
    Back,
    SkipTo(i64),
    Remove(i64),
    Empty,
    Flags(u32),
    Status,
    Queue,
    Help,
    Quit,
}

/// What the session should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Parse one input line; blank lines and `#` comments yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "enqueue" | "add" => {
            let Some((uri, title)) = split_uri(rest) else {
                return Err(missing("enqueue", "a song URI"));
            };
            Command::Enqueue { uri, title }
        }
        "play" => match args.as_slice() {
            [] => Command::Play,
            [ms] if ms.chars().all(|c| c.is_ascii_digit()) => {
                Command::PlayFrom(parse_millis("play", ms)?)
            }
            [uri] => Command::PlaySong {
                uri: (*uri).to_string(),
                start: None,
            },
            [uri, ms] => Command::PlaySong {
                uri: (*uri).to_string(),
                start: Some(parse_millis("play", ms)?),
            },
            _ => return Err(invalid("play", "expected [uri] [ms]")),
        },
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "seek" => Command::Seek(parse_millis("seek", single("seek", &args)?)?),
        "skip" | "next" => Command::Skip,
        "back" | "prev" => Command::Back,
        "skipto" => Command::SkipTo(parse_int("skipto", single("skipto", &args)?)?),
        "remove" | "rm" => Command::Remove(parse_int("remove", single("remove", &args)?)?),
        "empty" | "clear" => Command::Empty,
        "flags" => {
            let bits = single("flags", &args)?;
            let bits = bits
                .parse::<u32>()
                .map_err(|e| invalid("flags", &e.to_string()))?;
            Command::Flags(bits)
        }
        "status" => Command::Status,
        "queue" | "ls" => Command::Queue,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CliError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

/// Run a command against the controller
pub fn execute(controller: &PlaybackController, command: Command) -> Outcome {
    let message = match command {
        Command::Enqueue { uri, title } => {
            let mut song = Song::new(uri);
            if let Some(title) = title {
                song = song.with_title(title);
            }
            let label = song.to_string();
            let position = controller.enqueue(song);
            format!("queued {} at +{}", label, position)
        }
        Command::Play => report("play", controller.play()),
        Command::PlayFrom(start) => report("play", controller.play_from(start)),
        Command::PlaySong { uri, start } => {
            let song = Song::new(uri);
            let accepted = match start {
                Some(start) => controller.play_song_from(song, start),
                None => controller.play_song(song),
            };
            report("play", accepted)
        }
        Command::Pause => report("pause", controller.pause()),
        Command::Stop => report("stop", controller.stop()),
        Command::Seek(position) => report("seek", controller.seek_to(position)),
        Command::Skip => {
            controller.skip();
            now_playing(controller)
        }
        Command::Back => {
            controller.skip_back();
            now_playing(controller)
        }
        Command::SkipTo(position) => {
            if controller.skip_to(position) {
                now_playing(controller)
            } else {
                format!("no entry at {:+}", position)
            }
        }
        Command::Remove(position) => report("remove", controller.remove_from_queue(position)),
        Command::Empty => {
            controller.empty_queue();
            format!("queue length {}", controller.get_queue_length())
        }
        Command::Flags(bits) => {
            controller.set_transport_control_flags(TransportControlFlags::from_bits(bits));
            format!("flags {:#010b}", bits)
        }
        Command::Status => status(controller),
        Command::Queue => queue_listing(controller),
        Command::Help => HELP.to_string(),
        Command::Quit => return Outcome::Quit,
    };

    Outcome::Continue(message)
}

/// One-line summary of the transport and queue
pub fn status(controller: &PlaybackController) -> String {
    let song = controller
        .now_playing()
        .map_or_else(|| "nothing".to_string(), |song| song.to_string());

    format!(
        "{} | {} | {:.1}s / {:.1}s | queue {}/{}",
        controller.get_state(),
        song,
        controller.get_current_position().as_secs_f64(),
        controller.get_duration().as_secs_f64(),
        controller.get_queue_position(),
        controller.get_queue_length(),
    )
}

fn queue_listing(controller: &PlaybackController) -> String {
    let songs = controller.queue_snapshot();
    if songs.is_empty() {
        return "queue is empty".to_string();
    }

    let current = controller.current_index();
    let mut listing = String::new();
    for (index, song) in songs.iter().enumerate() {
        let marker = if Some(index) == current { '>' } else { ' ' };
        let _ = writeln!(listing, "{} {:>3}. {}", marker, index + 1, song);
    }
    listing.truncate(listing.trim_end().len());
    listing
}

fn now_playing(controller: &PlaybackController) -> String {
    match controller.now_playing() {
        Some(song) => format!("now playing {} ({})", song, controller.get_state()),
        None => "queue is empty".to_string(),
    }
}

fn report(action: &str, accepted: bool) -> String {
    if accepted {
        "ok".to_string()
    } else {
        format!("{} not possible now", action)
    }
}

fn split_uri(rest: &str) -> Option<(String, Option<String>)> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let uri = parts.next().filter(|uri| !uri.is_empty())?;
    let title = parts
        .next()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    Some((uri.to_string(), title))
}

fn single<'a>(command: &'static str, args: &[&'a str]) -> Result<&'a str> {
    match args {
        [value] => Ok(*value),
        [] => Err(missing(command, "an argument")),
        _ => Err(invalid(command, "expected one argument")),
    }
}

fn parse_millis(command: &'static str, value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| invalid(command, &format!("'{}' is not milliseconds: {}", value, e)))
}

fn parse_int(command: &'static str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|e| invalid(command, &format!("'{}': {}", value, e)))
}

fn missing(command: &'static str, what: &str) -> CliError {
    invalid(command, &format!("missing {}", what))
}

fn invalid(command: &'static str, reason: &str) -> CliError {
    CliError::InvalidArgument {
        command,
        reason: reason.to_string(),
    }
}
