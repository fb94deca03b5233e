use super::*;
use std::path::Path;
use std::time::Duration;

#[test]
fn track_without_tags_falls_back_to_filename_and_unknown() {
    let t = Track::new(
        TrackId(7),
        Path::new("/music/01 Intro.mp3"),
        TrackMetadata::default(),
    );
    assert_eq!(t.id, TrackId(7));
    assert_eq!(t.filename, "01 Intro.mp3");
    assert_eq!(t.title, "01 Intro.mp3");
    assert_eq!(t.artist, UNKNOWN);
    assert_eq!(t.album, UNKNOWN);
    assert_eq!(t.duration_secs, 0.0);
}

#[test]
fn track_keeps_tags_and_ignores_blank_ones() {
    let meta = TrackMetadata {
        title: Some("  Song  ".into()),
        artist: Some("   ".into()),
        album: Some("Record".into()),
        duration: Some(Duration::from_millis(2500)),
    };
    let t = Track::new(TrackId(1), Path::new("/music/song.ogg"), meta);
    assert_eq!(t.title, "Song");
    assert_eq!(t.artist, UNKNOWN);
    assert_eq!(t.album, "Record");
    assert_eq!(t.duration_secs, 2.5);
    assert_eq!(t.to_string(), "Unknown - Song");
}

#[test]
fn file_source_locate_distinguishes_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.mp3");
    std::fs::write(&present, b"bytes").unwrap();

    let src = FileSource::new(128);
    assert!(src.locate(&present).is_ok());
    assert!(matches!(
        src.locate(&dir.path().join("missing.mp3")),
        Err(SourceError::NotFound(_))
    ));
    // Directories are not sources.
    assert!(src.locate(dir.path()).is_err());
}

#[test]
fn file_source_open_serves_untagged_bytes_with_fallback_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.bin");
    std::fs::write(&path, vec![0xAB; 1000]).unwrap();

    let src = FileSource::new(128);
    let loaded = src.open(&path).unwrap();
    assert_eq!(loaded.bytes.len(), 1000);
    assert_eq!(loaded.byte_rate, 16_000);
    assert_eq!(loaded.sample_rate, 44_100);
    assert_eq!(loaded.channels, 2);

    // Garbage is not a tag failure worth surfacing.
    assert_eq!(src.extract(&path), TrackMetadata::default());
}

#[test]
fn file_source_rejects_empty_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.wav");
    std::fs::write(&empty, b"").unwrap();

    let src = FileSource::new(128);
    assert!(matches!(
        src.open(&empty),
        Err(SourceError::Unsupported { .. })
    ));
    assert!(matches!(
        src.open(&dir.path().join("gone.wav")),
        Err(SourceError::NotFound(_))
    ));
}

#[test]
fn huge_fallback_bitrate_saturates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.bin");
    std::fs::write(&path, vec![0x11; 10]).unwrap();

    let loaded = FileSource::new(u32::MAX).open(&path).unwrap();
    assert_eq!(loaded.byte_rate, u32::MAX / 8);
}
