use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

/// Stable identity of a playlist entry. Adding the same file twice yields two ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub const UNKNOWN: &str = "Unknown";

/// Tag data as reported by a metadata provider; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: TrackId,
    /// Where the bytes live. Only read when the track becomes current.
    pub path: PathBuf,
    pub filename: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
}

impl Track {
    /// Build a track descriptor, filling gaps in `meta` with filename-derived defaults.
    pub fn new(id: TrackId, path: &Path, meta: TrackMetadata) -> Self {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(UNKNOWN)
            .to_string();

        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            id,
            path: path.to_path_buf(),
            title: non_empty(meta.title).unwrap_or_else(|| filename.clone()),
            artist: non_empty(meta.artist).unwrap_or_else(|| UNKNOWN.to_string()),
            album: non_empty(meta.album).unwrap_or_else(|| UNKNOWN.to_string()),
            duration_secs: meta.duration.map_or(0.0, |d| d.as_secs_f64()),
            filename,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}
