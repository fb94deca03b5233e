//! Line-oriented admin console on stdin.
//!
//! Indexes typed by the operator are 1-based, as shown by `list`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::RelayError;
use crate::playback::{Command, LoopMode, Outcome};
use crate::session::{SessionId, Subscription};
use crate::station::Station;

use super::recorder;

const HELP: &str = "\
commands:
  play | pause | stop | next | prev
  select N          load track N
  add PATH          append a file to the playlist
  remove N          remove track N
  list              playlist as JSON
  status            playback snapshot as JSON
  loop MODE         no-loop | loop-all | loop-one
  record FILE SECS  write the live stream to FILE for SECS seconds
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Transport(Command),
    Add(PathBuf),
    /// 0-based playlist index.
    Remove(usize),
    List,
    Status,
    Record { path: PathBuf, secs: u64 },
    Help,
    Quit,
    Empty,
}

fn one_based(arg: Option<&str>, what: &str) -> Result<usize, String> {
    let raw = arg.ok_or_else(|| format!("usage: {what} N"))?;
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("`{raw}` is not a track number")),
    }
}

pub fn parse(line: &str) -> Result<Line, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let arg = Some(rest).filter(|r| !r.is_empty());

    let parsed = match word.to_ascii_lowercase().as_str() {
        "" => Line::Empty,
        "play" | "resume" => Line::Transport(Command::Play),
        "pause" => Line::Transport(Command::Pause),
        "stop" => Line::Transport(Command::Stop),
        "next" | "n" => Line::Transport(Command::Next),
        "prev" | "previous" | "p" => Line::Transport(Command::Previous),
        "select" => Line::Transport(Command::Select(one_based(arg, "select")?)),
        "remove" | "rm" => Line::Remove(one_based(arg, "remove")?),
        "add" => Line::Add(PathBuf::from(arg.ok_or("usage: add PATH")?)),
        "list" | "ls" => Line::List,
        "status" => Line::Status,
        "loop" => {
            let mode: LoopMode = arg.ok_or("usage: loop MODE")?.parse()?;
            Line::Transport(Command::SetLoopMode(mode))
        }
        "record" => {
            let (file, secs) = arg
                .and_then(|a| a.rsplit_once(char::is_whitespace))
                .ok_or("usage: record FILE SECS")?;
            let secs = secs
                .parse::<u64>()
                .map_err(|_| format!("`{secs}` is not a number of seconds"))?;
            Line::Record {
                path: PathBuf::from(file.trim()),
                secs,
            }
        }
        "help" | "?" => Line::Help,
        "quit" | "exit" | "q" => Line::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(parsed)
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(out, "{text}")
}

fn report(out: &mut impl Write, result: Result<String, RelayError>) -> io::Result<()> {
    match result {
        Ok(msg) => writeln!(out, "{msg}"),
        Err(e) => writeln!(out, "error: {e}"),
    }
}

fn execute(
    station: &Arc<Station>,
    admin: SessionId,
    line: Line,
    out: &mut impl Write,
) -> io::Result<()> {
    match line {
        Line::Empty | Line::Quit => Ok(()),
        Line::Help => writeln!(out, "{HELP}"),
        Line::Transport(cmd) => report(
            out,
            station.command(admin, cmd).map(|o| match o {
                Outcome::Applied => "ok".to_string(),
                Outcome::AlreadyAtState => "ok (unchanged)".to_string(),
            }),
        ),
        Line::Add(path) => report(
            out,
            station
                .add_track(admin, &path)
                .map(|id| format!("added {id}")),
        ),
        Line::Remove(index) => {
            let view = station.playlist();
            let result = match view.playlist.get(index) {
                Some(track) => station
                    .remove_track(admin, track.id)
                    .map(|()| format!("removed {}", track.id)),
                None => Err(RelayError::IndexOutOfRange {
                    index,
                    len: view.playlist.len(),
                }),
            };
            report(out, result)
        }
        Line::List => print_json(out, &station.playlist()),
        Line::Status => print_json(out, &station.snapshot()),
        Line::Record { path, secs } => {
            recorder::spawn(Arc::clone(station), path.clone(), Duration::from_secs(secs))?;
            writeln!(out, "recording to {} for {secs}s", path.display())
        }
    }
}

/// Read commands until `quit` or end of input.
pub fn run(
    station: &Arc<Station>,
    admin: SessionId,
    input: impl BufRead,
    mut out: impl Write,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        match parse(&line) {
            Ok(Line::Quit) => break,
            Ok(parsed) => execute(station, admin, parsed, &mut out)?,
            Err(msg) => writeln!(out, "error: {msg}")?,
        }
        out.flush()?;
    }
    debug!("console closed");
    Ok(())
}

/// Print every notification the admin session receives as one JSON line.
pub fn spawn_watcher(station: Arc<Station>, sub: Subscription) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("onair-watch".into())
        .spawn(move || {
            loop {
                match sub.recv_timeout(Duration::from_millis(200)) {
                    Ok(event) => {
                        if let Ok(line) = serde_json::to_string(event.as_ref()) {
                            println!("{line}");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) if station.is_shut_down() => break,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
}
