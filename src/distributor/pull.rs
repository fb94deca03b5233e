//! Pull mode: consumers read the live track at their own pace.
//!
//! A cursor only ever reads bytes the pacing driver has already released
//! (below the live position), so a reader can lag but never run ahead. Slow
//! readers fall behind in their own stream only; the buffer they read from is
//! immutable while its track is current.

use bytes::Bytes;

use crate::playback::PlaybackState;

#[derive(Debug, Clone, Default)]
pub struct PullCursor {
    epoch: Option<u64>,
    offset: usize,
}

impl PullCursor {
    /// A detached cursor; the first pull attaches it at the live position.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_attached(&self) -> bool {
        self.epoch.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    Chunk(Bytes),
    /// The stream this cursor was reading has ended or been replaced. The
    /// next pull rejoins the current track live.
    EndOfTrack,
    /// Nothing new at the cursor yet.
    Idle,
}

/// Read up to `max` released bytes at `cursor`, advancing it.
pub fn pull(state: &PlaybackState, cursor: &mut PullCursor, max: usize) -> Pulled {
    let Some(loaded) = state.loaded.as_ref() else {
        if cursor.epoch.take().is_some() {
            return Pulled::EndOfTrack;
        }
        return Pulled::Idle;
    };

    match cursor.epoch {
        None => {
            cursor.epoch = Some(state.epoch);
            cursor.offset = state.position;
        }
        Some(epoch) if epoch != state.epoch => {
            cursor.epoch = None;
            return Pulled::EndOfTrack;
        }
        Some(_) => {}
    }

    let live = state.position.min(loaded.total_bytes());
    if cursor.offset >= live {
        return Pulled::Idle;
    }

    let end = live.min(cursor.offset + max.max(1));
    let chunk = loaded.bytes.slice(cursor.offset..end);
    cursor.offset = end;
    Pulled::Chunk(chunk)
}
