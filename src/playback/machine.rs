use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::event::{ChunkFrame, Event, PlaylistView, Snapshot, now_millis};
use crate::library::{ByteProvider, MetadataProvider, TrackId};
use crate::playlist::Playlist;

use super::types::{Command, Loaded, LoopMode, Outcome, Phase, PlaybackState};

/// What one pacing step produced.
#[derive(Debug, Default)]
pub struct Advance {
    /// Notifications first, then at most one chunk, in publish order.
    pub events: Vec<Event>,
    /// Real-time length of the emitted chunk, if one was emitted.
    pub interval: Option<Duration>,
}

/// Playlist plus play cursor. Every method is one critical section: the
/// owner holds the lock for the whole call and publishes the returned events
/// before releasing it.
#[derive(Debug)]
pub struct PlaybackMachine {
    playlist: Playlist,
    state: PlaybackState,
    chunk_size: usize,
    next_chunk_index: u64,
    /// Bumped by every change the pacing driver must react to.
    generation: u64,
}

impl PlaybackMachine {
    pub fn new(chunk_size: usize, loop_mode: LoopMode) -> Self {
        Self {
            playlist: Playlist::new(),
            state: PlaybackState {
                loop_mode,
                ..PlaybackState::default()
            },
            chunk_size: chunk_size.max(1),
            next_chunk_index: 0,
            generation: 0,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn apply(
        &mut self,
        bytes: &dyn ByteProvider,
        cmd: &Command,
    ) -> RelayResult<(Outcome, Vec<Event>)> {
        match cmd {
            Command::Play => self.play(bytes),
            Command::Pause => Ok(self.pause()),
            Command::Stop => Ok(self.stop()),
            Command::Next => {
                let target = self.relative_target(Playlist::next_index)?;
                self.jump(bytes, target)
            }
            Command::Previous => {
                let target = self.relative_target(Playlist::prev_index)?;
                self.jump(bytes, target)
            }
            Command::Select(index) => {
                if self.playlist.is_empty() {
                    return Err(RelayError::EmptyPlaylist);
                }
                if *index >= self.playlist.len() {
                    return Err(RelayError::IndexOutOfRange {
                        index: *index,
                        len: self.playlist.len(),
                    });
                }
                self.jump(bytes, *index)
            }
            Command::SetLoopMode(mode) => Ok(self.set_loop_mode(*mode)),
        }
    }

    fn play(&mut self, bytes: &dyn ByteProvider) -> RelayResult<(Outcome, Vec<Event>)> {
        if self.playlist.is_empty() {
            return Err(RelayError::EmptyPlaylist);
        }
        if self.state.phase == Phase::Playing {
            return Ok((Outcome::AlreadyAtState, Vec::new()));
        }

        let mut events = Vec::new();
        if self.state.loaded.is_none() {
            let index = self.state.current_index.unwrap_or(0);
            let loaded = self.load(bytes, index)?;
            events.push(self.install(index, loaded));
        }

        self.state.phase = Phase::Playing;
        self.generation += 1;
        events.push(Event::playback_state(Phase::Playing));
        Ok((Outcome::Applied, events))
    }

    fn pause(&mut self) -> (Outcome, Vec<Event>) {
        if self.state.phase != Phase::Playing {
            return (Outcome::AlreadyAtState, Vec::new());
        }
        self.state.phase = Phase::Paused;
        self.generation += 1;
        (Outcome::Applied, vec![Event::playback_state(Phase::Paused)])
    }

    fn stop(&mut self) -> (Outcome, Vec<Event>) {
        if self.state.phase == Phase::Stopped && self.state.position == 0 {
            return (Outcome::AlreadyAtState, Vec::new());
        }
        self.rewind_stopped();
        (Outcome::Applied, vec![Event::playback_state(Phase::Stopped)])
    }

    fn set_loop_mode(&mut self, mode: LoopMode) -> (Outcome, Vec<Event>) {
        if self.state.loop_mode == mode {
            return (Outcome::AlreadyAtState, Vec::new());
        }
        self.state.loop_mode = mode;
        (Outcome::Applied, Vec::new())
    }

    fn relative_target(
        &self,
        step: fn(&Playlist, usize) -> Option<usize>,
    ) -> RelayResult<usize> {
        let current = self.state.current_index.unwrap_or(0);
        step(&self.playlist, current).ok_or(RelayError::EmptyPlaylist)
    }

    /// Load `index` and make it current. The phase is left alone, so a
    /// stopped relay stays stopped with the new track cued.
    fn jump(
        &mut self,
        bytes: &dyn ByteProvider,
        index: usize,
    ) -> RelayResult<(Outcome, Vec<Event>)> {
        let loaded = self.load(bytes, index)?;
        Ok((Outcome::Applied, vec![self.install(index, loaded)]))
    }

    fn load(&self, bytes: &dyn ByteProvider, index: usize) -> RelayResult<Loaded> {
        let track = self
            .playlist
            .get(index)
            .ok_or(RelayError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;
        let source = bytes.open(&track.path)?;
        Ok(Loaded {
            track: track.id,
            bytes: source.bytes,
            sample_rate: source.sample_rate,
            channels: source.channels,
            byte_rate: source.byte_rate,
        })
    }

    /// Swap in a freshly loaded buffer at position 0.
    fn install(&mut self, index: usize, loaded: Loaded) -> Event {
        let total = loaded.total_bytes();
        self.state.current_index = Some(index);
        self.state.loaded = Some(loaded);
        self.state.position = 0;
        self.state.epoch += 1;
        self.generation += 1;

        let track = self.playlist.get(index).cloned();
        info!(
            index,
            total_bytes = total,
            track = track.as_ref().map(|t| t.title.as_str()).unwrap_or_default(),
            "track loaded"
        );

        match track {
            Some(track) => Event::TrackChanged { track, index },
            None => Event::PlaybackStopped,
        }
    }

    fn rewind_stopped(&mut self) {
        self.state.phase = Phase::Stopped;
        self.state.position = 0;
        self.state.epoch += 1;
        self.generation += 1;
    }

    fn halt(&mut self) -> Event {
        self.rewind_stopped();
        info!("playback stopped");
        Event::PlaybackStopped
    }

    /// One pacing step: run the end-of-track transition if the buffer is
    /// exhausted, then emit the next chunk if still playing.
    pub fn advance(&mut self, bytes: &dyn ByteProvider) -> Advance {
        let mut out = Advance::default();
        if self.state.phase != Phase::Playing {
            return out;
        }

        if self.state.position >= self.state.total_bytes() {
            out.events.push(self.end_of_track(bytes));
            if self.state.phase != Phase::Playing {
                return out;
            }
        }

        if let Some((frame, interval)) = self.next_frame() {
            out.events.push(Event::Chunk(frame));
            out.interval = Some(interval);
        }
        out
    }

    fn end_of_track(&mut self, bytes: &dyn ByteProvider) -> Event {
        let len = self.playlist.len();
        let target = self.state.current_index.and_then(|current| match self.state.loop_mode {
            LoopMode::LoopOne => Some(current),
            LoopMode::LoopAll => self.playlist.next_index(current),
            LoopMode::NoLoop => (current + 1 < len).then_some(current + 1),
        });

        let Some(index) = target else {
            debug!(loop_mode = ?self.state.loop_mode, "no track after the current one");
            return self.halt();
        };

        match self.load(bytes, index) {
            Ok(loaded) => self.install(index, loaded),
            Err(e) => {
                warn!(index, error = %e, "auto-advance failed");
                self.halt()
            }
        }
    }

    fn next_frame(&mut self) -> Option<(ChunkFrame, Duration)> {
        let loaded = self.state.loaded.as_ref()?;
        let start = self.state.position;
        let end = (start + self.chunk_size).min(loaded.total_bytes());
        if start >= end {
            return None;
        }

        let frame = ChunkFrame {
            chunk_index: self.next_chunk_index,
            track: loaded.track,
            offset: start,
            sample_rate: loaded.sample_rate,
            channels: loaded.channels,
            timestamp: now_millis(),
            data: loaded.bytes.slice(start..end),
        };
        let interval = loaded.duration_of(end - start);

        self.next_chunk_index += 1;
        self.state.position = end;
        Some((frame, interval))
    }

    pub fn add_track(
        &mut self,
        bytes: &dyn ByteProvider,
        tags: &dyn MetadataProvider,
        path: &Path,
    ) -> RelayResult<(TrackId, Vec<Event>)> {
        bytes.locate(path).map_err(|source| RelayError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let id = self.playlist.push(path, tags.extract(path));
        if self.state.current_index.is_none() {
            self.state.current_index = Some(0);
        }
        Ok((
            id,
            vec![Event::PlaylistUpdated {
                len: self.playlist.len(),
            }],
        ))
    }

    /// Remove a track. Removing the current track while playing or paused
    /// moves on to the track that followed it (or stops if none is left or it
    /// cannot be loaded). Removing an earlier track shifts the index so it
    /// keeps pointing at the same track.
    pub fn remove_track(
        &mut self,
        bytes: &dyn ByteProvider,
        id: TrackId,
    ) -> RelayResult<Vec<Event>> {
        let index = self
            .playlist
            .position(id)
            .ok_or(RelayError::UnknownTrack(id))?;
        let current = self.state.current_index;
        let mut events = Vec::new();

        self.playlist.remove(id);

        match current {
            Some(c) if c == index => {
                let active = self.state.phase != Phase::Stopped;
                self.state.loaded = None;

                if self.playlist.is_empty() {
                    self.state.current_index = None;
                    if active {
                        events.push(self.halt());
                    } else {
                        self.rewind_stopped();
                    }
                } else {
                    let next = index % self.playlist.len();
                    self.state.current_index = Some(next);
                    if active {
                        match self.load(bytes, next) {
                            Ok(loaded) => events.push(self.install(next, loaded)),
                            Err(e) => {
                                warn!(index = next, error = %e, "could not load replacement track");
                                events.push(self.halt());
                            }
                        }
                    } else {
                        self.rewind_stopped();
                    }
                }
            }
            Some(c) if index < c => self.state.current_index = Some(c - 1),
            _ => {}
        }

        events.push(Event::PlaylistUpdated {
            len: self.playlist.len(),
        });
        Ok(events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let loaded = self.state.loaded.as_ref();
        Snapshot {
            current_track: self
                .state
                .current_index
                .and_then(|i| self.playlist.get(i))
                .cloned(),
            current_index: self.state.current_index,
            phase: self.state.phase,
            position_bytes: self.state.position,
            total_bytes: self.state.total_bytes(),
            position_secs: loaded.map_or(0.0, |l| l.duration_of(self.state.position).as_secs_f64()),
            loop_mode: self.state.loop_mode,
            playlist: self.playlist.tracks().to_vec(),
        }
    }

    pub fn playlist_view(&self) -> PlaylistView {
        PlaylistView {
            playlist: self.playlist.tracks().to_vec(),
            current_index: self.state.current_index,
            is_playing: self.state.phase == Phase::Playing,
        }
    }
}
