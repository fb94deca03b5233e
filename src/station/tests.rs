use super::*;
use crate::library::memory::MemorySource;
use std::path::PathBuf;

fn station(
    tracks: &[(&str, usize)],
) -> (Arc<Station>, Arc<MemorySource>, SessionId, Subscription) {
    let mut settings = Settings::default();
    settings.stream.chunk_size = 100;
    settings.stream.subscriber_queue_len = 256;

    let src = Arc::new(MemorySource::new());
    let station = Arc::new(Station::new(&settings, src.clone(), src.clone()));
    let admin = station.connect(Role::Admin);
    let id = admin.id();
    for (name, len) in tracks {
        let path = PathBuf::from(format!("/music/{name}.mp3"));
        src.insert(&path, *len, 1000, 0);
        station.add_track(id, &path).unwrap();
    }
    admin.drain();
    (station, src, id, admin)
}

#[test]
fn listeners_cannot_control_playback() {
    let (station, _src, _admin, _sub) = station(&[("a", 1000)]);
    let listener = station.connect(Role::Listener);

    assert!(matches!(
        station.command(listener.id(), Command::Play),
        Err(RelayError::Forbidden(_))
    ));
    assert!(matches!(
        station.add_track(listener.id(), Path::new("/music/a.mp3")),
        Err(RelayError::Forbidden(_))
    ));
    assert!(matches!(
        station.command(SessionId(999), Command::Play),
        Err(RelayError::UnknownSession(_))
    ));
    assert_eq!(station.snapshot().phase, Phase::Stopped);
}

#[test]
fn greeting_reflects_the_state_at_connect_time() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);

    let before = station.connect(Role::Listener);
    match before.try_recv().as_deref() {
        Some(Event::Connected {
            current_track,
            is_playing,
            ..
        }) => {
            assert!(current_track.is_none());
            assert!(!is_playing);
        }
        other => panic!("unexpected {other:?}"),
    }

    station.command(admin, Command::Play).unwrap();
    let after = station.connect(Role::Listener);
    match after.try_recv().as_deref() {
        Some(Event::Connected {
            current_track: Some(track),
            phase: Phase::Playing,
            is_playing: true,
            ..
        }) => assert_eq!(track.filename, "a.mp3"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn every_session_sees_the_same_ordered_history() {
    let (station, _src, admin, admin_sub) = station(&[("a", 150), ("b", 150)]);
    let listener = station.connect(Role::Listener);
    station.join_room(listener.id(), Room::Stream).unwrap();
    listener.drain();

    station.command(admin, Command::Play).unwrap();
    for _ in 0..6 {
        station.advance();
    }

    let seen: Vec<String> = listener
        .drain()
        .iter()
        .map(|e| match e.as_ref() {
            Event::TrackChanged { index, .. } => format!("track {index}"),
            Event::PlaybackState { phase, .. } => format!("state {phase}"),
            Event::Chunk(f) => format!("chunk {}@{}", f.chunk_index, f.offset),
            Event::PlaybackStopped => "stopped".to_string(),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            "track 0",
            "state playing",
            "chunk 0@0",
            "chunk 1@100",
            "track 1",
            "chunk 2@0",
            "chunk 3@100",
            "stopped",
        ]
    );

    // The admin is not in the stream room: same notifications, no chunks.
    let admin_seen = admin_sub.drain();
    assert_eq!(admin_seen.len(), 4);
    assert!(admin_seen.iter().all(|e| !e.is_stream_scoped()));
}

#[test]
fn request_sync_reports_position_and_playlist() {
    let (station, _src, admin, _sub) = station(&[("a", 1000), ("b", 1000)]);
    let listener = station.connect(Role::Listener);

    station.command(admin, Command::Select(1)).unwrap();
    station.command(admin, Command::Play).unwrap();
    station.advance();
    station.advance();

    let snap = station.request_sync(listener.id()).unwrap();
    assert_eq!(snap.current_index, Some(1));
    assert_eq!(snap.position_bytes, 200);
    assert_eq!(snap.total_bytes, 1000);
    assert!((snap.position_secs - 0.2).abs() < 1e-9);
    assert_eq!(snap.playlist.len(), 2);

    assert!(matches!(
        station.request_sync(SessionId(999)),
        Err(RelayError::UnknownSession(_))
    ));
}

#[test]
fn listener_position_tracks_delivered_chunks() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);
    let listener = station.connect(Role::Listener);
    station.join_room(listener.id(), Room::Stream).unwrap();

    station.command(admin, Command::Play).unwrap();
    station.advance();
    station.advance();
    station.advance();
    assert_eq!(station.last_delivered_position(listener.id()), Some(300));
}

#[test]
fn heartbeat_carries_the_phase() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);
    let listener = station.connect(Role::Listener);
    station.join_room(listener.id(), Room::Stream).unwrap();
    station.command(admin, Command::Play).unwrap();
    station.command(admin, Command::Pause).unwrap();
    listener.drain();

    station.heartbeat();
    assert!(matches!(
        listener.try_recv().as_deref(),
        Some(Event::Heartbeat {
            phase: Phase::Paused
        })
    ));
}

#[test]
fn commands_bump_the_generation_the_driver_waits_on() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);
    let tick = station.advance();
    assert!(tick.interval.is_none());

    station.command(admin, Command::Play).unwrap();
    let wake = station.wait_for_change(tick.generation, Instant::now() + Duration::from_secs(5));
    assert_eq!(wake, Wake::Changed);

    let tick = station.advance();
    let interval = tick.interval.unwrap();
    assert!((interval.as_secs_f64() - 0.1).abs() < 1e-9);
    let wake = station.wait_for_change(tick.generation, Instant::now());
    assert_eq!(wake, Wake::Timeout);

    station.shutdown();
    assert_eq!(
        station.wait_for_change(tick.generation, Instant::now() + Duration::from_secs(5)),
        Wake::Shutdown
    );
}

#[test]
fn blocking_pull_wakes_when_bytes_are_released() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);
    station.command(admin, Command::Play).unwrap();

    let mut cursor = PullCursor::new();
    assert_eq!(station.pull(&mut cursor), Pulled::Idle);

    let producer = {
        let station = Arc::clone(&station);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            station.advance();
        })
    };

    let got = station.wait_pull_for(&mut cursor, Duration::from_secs(5));
    producer.join().unwrap();
    assert!(matches!(got, Pulled::Chunk(b) if b.len() == 100));
}

#[test]
fn blocking_pull_times_out_while_stopped() {
    let (station, _src, _admin, _sub) = station(&[("a", 1000)]);
    let mut cursor = PullCursor::new();
    let got = station.wait_pull_for(&mut cursor, Duration::from_millis(10));
    assert_eq!(got, Pulled::Idle);
}

#[test]
fn removal_by_listener_is_refused_and_playlist_is_unchanged() {
    let (station, _src, admin, _sub) = station(&[("a", 1000), ("b", 1000)]);
    let listener = station.connect(Role::Listener);
    let id = station.playlist().playlist[0].id;

    assert!(matches!(
        station.remove_track(listener.id(), id),
        Err(RelayError::Forbidden(_))
    ));
    station.remove_track(admin, id).unwrap();
    let view = station.playlist();
    assert_eq!(view.playlist.len(), 1);
    assert_eq!(view.current_index, Some(0));
    assert!(!view.is_playing);
}

#[test]
fn leaving_the_stream_room_stops_chunks_but_not_notifications() {
    let (station, _src, admin, _sub) = station(&[("a", 1000)]);
    let listener = station.connect(Role::Listener);
    station.join_room(listener.id(), Room::Stream).unwrap();
    station.command(admin, Command::Play).unwrap();
    station.advance();
    station.leave_room(listener.id(), &Room::Stream).unwrap();
    listener.drain();

    station.advance();
    station.command(admin, Command::Pause).unwrap();
    let got = listener.drain();
    assert_eq!(got.len(), 1);
    assert!(matches!(
        got[0].as_ref(),
        Event::PlaybackState {
            phase: Phase::Paused,
            ..
        }
    ));

    assert_eq!(station.publish_to_room(&Room::Stream, Event::PlaybackStopped), 0);
    assert!(station.disconnect(listener.id()));
    assert_eq!(station.session_count(), 1);
}
