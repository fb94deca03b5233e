//! Ordered, duplicate-friendly track list.
//!
//! Pure data: the playback machine decides what removals and index moves
//! mean for the play cursor.

use std::path::Path;

use crate::library::{Track, TrackId, TrackMetadata};

#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    next_id: u64,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Append a track and hand back its freshly minted id.
    pub fn push(&mut self, path: &Path, meta: TrackMetadata) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.tracks.push(Track::new(id, path, meta));
        id
    }

    /// Remove the track with `id`, returning where it sat.
    pub fn remove(&mut self, id: TrackId) -> Option<(usize, Track)> {
        let index = self.position(id)?;
        Some((index, self.tracks.remove(index)))
    }

    /// `(i + 1) % n`. `None` when empty.
    pub fn next_index(&self, i: usize) -> Option<usize> {
        let n = self.tracks.len();
        (n > 0).then(|| (i + 1) % n)
    }

    /// `(i - 1 + n) % n`. `None` when empty.
    pub fn prev_index(&self, i: usize) -> Option<usize> {
        let n = self.tracks.len();
        (n > 0).then(|| (i % n + n - 1) % n)
    }
}
