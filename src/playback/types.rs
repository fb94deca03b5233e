//! Playback-related small types.
//!
//! Transport phase, loop policy, commands and the loaded-track handle shared
//! by the state machine, the pacing driver and pull readers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::config::LoopModeSetting;
use crate::library::TrackId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Stopped => "stopped",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// What the end of the current track leads to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopMode {
    /// Advance to the next track; stop after the last one.
    #[default]
    NoLoop,
    /// Advance to the next track, wrapping to the first after the last one.
    LoopAll,
    /// Restart the current track.
    LoopOne,
}

impl From<LoopModeSetting> for LoopMode {
    fn from(s: LoopModeSetting) -> Self {
        match s {
            LoopModeSetting::NoLoop => LoopMode::NoLoop,
            LoopModeSetting::LoopAll => LoopMode::LoopAll,
            LoopModeSetting::LoopOne => LoopMode::LoopOne,
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "no-loop" | "noloop" | "off" | "none" => Ok(LoopMode::NoLoop),
            "loop-all" | "loopall" | "all" | "wrap" => Ok(LoopMode::LoopAll),
            "loop-one" | "loopone" | "one" | "repeat-one" => Ok(LoopMode::LoopOne),
            other => Err(format!("unknown loop mode `{other}`")),
        }
    }
}

/// Transport commands an admin session may issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start (or resume) playback of the current track.
    Play,
    /// Pause, keeping the position.
    Pause,
    /// Stop and rewind the current track.
    Stop,
    /// Load the next track (modular).
    Next,
    /// Load the previous track (modular).
    Previous,
    /// Load the track at the given playlist index.
    Select(usize),
    /// Change the end-of-track policy.
    SetLoopMode(LoopMode),
}

/// Result of a command that did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The command asked for the state we were already in; nothing changed.
    AlreadyAtState,
}

/// A track whose bytes are fully in memory. The buffer never changes while
/// the track is current; a new load replaces the whole handle.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub track: TrackId,
    pub bytes: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_rate: u32,
}

impl Loaded {
    pub fn total_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Real-time length of `len` bytes of this track.
    pub fn duration_of(&self, len: usize) -> Duration {
        Duration::from_secs_f64(len as f64 / f64::from(self.byte_rate.max(1)))
    }
}

/// The single source of truth every listener converges to.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub phase: Phase,
    /// `Some` whenever the playlist is non-empty.
    pub current_index: Option<usize>,
    pub position: usize,
    pub loaded: Option<Loaded>,
    /// Bumped whenever the byte stream restarts (track load or stop), so pull
    /// cursors can tell their offsets went stale.
    pub epoch: u64,
    pub loop_mode: LoopMode,
}

impl PlaybackState {
    pub fn total_bytes(&self) -> usize {
        self.loaded.as_ref().map_or(0, Loaded::total_bytes)
    }
}
