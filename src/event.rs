//! Everything the relay tells its sessions, plus the sync snapshot.
//!
//! Events derive `Serialize` so a transport can forward them as JSON. Chunk
//! payloads are skipped there; transports write the raw bytes themselves.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;

use crate::library::{Track, TrackId};
use crate::playback::{LoopMode, Phase};
use crate::session::{Room, SessionId};

#[derive(Debug, Clone, Serialize)]
pub struct ChunkFrame {
    /// Strictly increasing for the lifetime of the relay, across track changes.
    pub chunk_index: u64,
    pub track: TrackId,
    /// Byte offset of `data` inside the track.
    pub offset: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// Wall-clock emission time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(skip)]
    pub data: Bytes,
}

impl ChunkFrame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Greeting sent to a session right after it connects.
    Connected {
        session: SessionId,
        current_track: Option<Track>,
        phase: Phase,
        is_playing: bool,
    },
    /// Acknowledges a room join to the joining session only.
    Joined { room: Room },
    TrackChanged { track: Track, index: usize },
    PlaybackState { phase: Phase, is_playing: bool },
    /// Playback ran out (or failed) on its own; nothing is queued.
    PlaybackStopped,
    PlaylistUpdated { len: usize },
    Chunk(ChunkFrame),
    /// Keeps idle stream connections alive while nothing is playing.
    Heartbeat { phase: Phase },
}

impl Event {
    pub fn playback_state(phase: Phase) -> Self {
        Event::PlaybackState {
            phase,
            is_playing: phase == Phase::Playing,
        }
    }

    /// Stream-scoped events only reach members of the stream room; every
    /// other broadcast reaches all connected sessions.
    pub fn is_stream_scoped(&self) -> bool {
        matches!(self, Event::Chunk(_) | Event::Heartbeat { .. })
    }

    /// Bytes this event contributes to a subscriber's backlog.
    pub fn payload_len(&self) -> usize {
        match self {
            Event::Chunk(frame) => frame.len(),
            _ => 0,
        }
    }
}

/// Point-in-time view for late joiners.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub phase: Phase,
    pub position_bytes: usize,
    pub total_bytes: usize,
    /// Position expressed in seconds of the current track.
    pub position_secs: f64,
    pub loop_mode: LoopMode,
    pub playlist: Vec<Track>,
}

/// What a playlist listing returns.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistView {
    pub playlist: Vec<Track>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
