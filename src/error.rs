//! Relay error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::library::{SourceError, TrackId};
use crate::session::SessionId;

/// Errors returned synchronously to whoever issued a command. None of them
/// leaves shared state modified.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("index {index} out of range for a playlist of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },

    /// The track's bytes could not be loaded when it was about to play.
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("cannot stream {}: {reason}", path.display())]
    DecodeUnsupported { path: PathBuf, reason: String },

    /// A track could not be added because its path does not resolve.
    #[error("cannot add {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("no track with id {0}")]
    UnknownTrack(TrackId),

    #[error("no session {0}")]
    UnknownSession(SessionId),

    #[error("session {0} is not allowed to control playback")]
    Forbidden(SessionId),
}

impl From<SourceError> for RelayError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Unsupported { path, reason } => {
                RelayError::DecodeUnsupported { path, reason }
            }
            other => RelayError::SourceUnavailable(other),
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
