use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::console::{self, Line};
use super::recorder;
use crate::config::Settings;
use crate::library::memory::MemorySource;
use crate::pacing::PacingDriver;
use crate::playback::{Command, LoopMode, Phase};
use crate::session::{Role, SessionId, Subscription};
use crate::station::Station;

/// The station, its admin id and the admin's subscription, which must stay
/// alive or the session is dropped on the first publish.
fn station(tracks: &[(&str, usize, u32)]) -> (Arc<Station>, SessionId, Subscription) {
    let mut settings = Settings::default();
    settings.stream.chunk_size = 100;
    settings.stream.idle_heartbeat_ms = 10;

    let src = Arc::new(MemorySource::new());
    for (name, len, rate) in tracks {
        src.insert(format!("/music/{name}.mp3"), *len, *rate, 42);
    }
    let station = Arc::new(Station::new(&settings, src.clone(), src));
    let admin = station.connect(Role::Admin);
    (station, admin.id(), admin)
}

fn console_output(station: &Arc<Station>, admin: SessionId, script: &str) -> String {
    let mut out = Vec::new();
    console::run(station, admin, Cursor::new(script), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn parses_transport_commands() {
    assert_eq!(console::parse("play"), Ok(Line::Transport(Command::Play)));
    assert_eq!(console::parse("  PAUSE "), Ok(Line::Transport(Command::Pause)));
    assert_eq!(console::parse("prev"), Ok(Line::Transport(Command::Previous)));
    assert_eq!(
        console::parse("select 3"),
        Ok(Line::Transport(Command::Select(2)))
    );
    assert_eq!(
        console::parse("loop loop-one"),
        Ok(Line::Transport(Command::SetLoopMode(LoopMode::LoopOne)))
    );
    assert_eq!(console::parse(""), Ok(Line::Empty));
    assert_eq!(console::parse("quit"), Ok(Line::Quit));
}

#[test]
fn parses_arguments_and_rejects_bad_ones() {
    assert_eq!(
        console::parse("add /music/with space.mp3"),
        Ok(Line::Add(PathBuf::from("/music/with space.mp3")))
    );
    assert_eq!(console::parse("remove 1"), Ok(Line::Remove(0)));
    assert_eq!(
        console::parse("record /tmp/out.mp3 30"),
        Ok(Line::Record {
            path: PathBuf::from("/tmp/out.mp3"),
            secs: 30
        })
    );

    assert!(console::parse("select 0").is_err());
    assert!(console::parse("select").is_err());
    assert!(console::parse("remove x").is_err());
    assert!(console::parse("loop sideways").is_err());
    assert!(console::parse("record /tmp/out.mp3").is_err());
    assert!(console::parse("dance").is_err());
}

#[test]
fn console_drives_the_station() {
    let (station, admin, _admin_sub) = station(&[("a", 1000, 1000), ("b", 1000, 1000)]);
    let out = console_output(
        &station,
        admin,
        "add /music/a.mp3\nadd /music/b.mp3\nselect 2\nplay\nplay\nstatus\nquit\nstop\n",
    );

    assert!(out.contains("added #0"));
    assert!(out.contains("added #1"));
    assert!(out.contains("ok (unchanged)"));
    assert!(out.contains("\"phase\": \"playing\""));
    assert!(out.contains("\"current_index\": 1"));

    // Nothing after `quit` runs.
    let snap = station.snapshot();
    assert_eq!(snap.phase, Phase::Playing);
    assert_eq!(snap.current_index, Some(1));
    assert_eq!(station.session_count(), 1);
}

#[test]
fn console_reports_errors_and_keeps_going() {
    let (station, admin, _admin_sub) = station(&[("a", 1000, 1000)]);
    let out = console_output(
        &station,
        admin,
        "play\nadd /music/missing.mp3\nremove 4\nbogus\nadd /music/a.mp3\nremove 1\nlist\n",
    );

    assert!(out.contains("error: playlist is empty"));
    assert!(out.contains("error: cannot add /music/missing.mp3"));
    assert!(out.contains("error: index 3 out of range"));
    assert!(out.contains("error: unknown command `bogus`"));
    assert!(out.contains("removed #0"));
    assert!(out.contains("\"playlist\": []"));
}

#[test]
fn console_refuses_listener_sessions() {
    let (station, _admin, _admin_sub) = station(&[("a", 1000, 1000)]);
    let listener = station.connect(Role::Listener);
    let out = console_output(&station, listener.id(), "add /music/a.mp3\n");
    assert!(out.contains("not allowed"));
    assert!(station.playlist().playlist.is_empty());
}

#[test]
fn recorder_writes_the_live_stream() {
    // 100 bytes per 5ms.
    let (station, admin, _admin_sub) = station(&[("a", 2000, 20_000)]);
    station
        .add_track(admin, std::path::Path::new("/music/a.mp3"))
        .unwrap();
    let driver = PacingDriver::spawn(Arc::clone(&station)).unwrap();
    station.command(admin, Command::Play).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.mp3");
    let written = recorder::record(&station, &path, Duration::from_millis(60)).unwrap();
    driver.shutdown();

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len() as u64, written);
    assert!(!data.is_empty());
    assert!(data.iter().all(|b| *b == 42));
}

#[test]
fn recorder_with_nothing_playing_writes_an_empty_file() {
    let (station, _admin, _admin_sub) = station(&[]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.mp3");

    let written = recorder::record(&station, &path, Duration::from_millis(20)).unwrap();
    assert_eq!(written, 0);
    assert!(path.exists());
}
