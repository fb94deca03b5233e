//! Playback state machine: the playlist, the play cursor and the transport
//! commands that move it.

mod machine;
mod types;

pub use machine::*;
pub use types::*;
