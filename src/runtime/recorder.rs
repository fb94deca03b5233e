//! Pull-mode consumer that writes the live stream to a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::distributor::{PullCursor, Pulled};
use crate::station::Station;

/// Longest single wait, so a recording notices shutdown and its deadline.
const POLL: Duration = Duration::from_millis(200);

/// Record whatever plays during `duration` into `path`. Returns the number of
/// bytes written. Track changes are followed; silence is not padded.
pub fn record(station: &Station, path: &Path, duration: Duration) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut cursor = PullCursor::new();
    let mut written = 0u64;
    let deadline = Instant::now() + duration;

    loop {
        let now = Instant::now();
        if now >= deadline || station.is_shut_down() {
            break;
        }
        match station.wait_pull_for(&mut cursor, (deadline - now).min(POLL)) {
            Pulled::Chunk(bytes) => {
                out.write_all(&bytes)?;
                written += bytes.len() as u64;
            }
            Pulled::EndOfTrack => debug!("recorder: track ended, rejoining live"),
            Pulled::Idle => {}
        }
    }

    out.flush()?;
    Ok(written)
}

/// Run [`record`] on its own thread and log the result.
pub fn spawn(
    station: Arc<Station>,
    path: PathBuf,
    duration: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("onair-recorder".into())
        .spawn(move || {
            info!(path = %path.display(), secs = duration.as_secs(), "recording started");
            match record(&station, &path, duration) {
                Ok(bytes) => info!(path = %path.display(), bytes, "recording finished"),
                Err(e) => warn!(path = %path.display(), error = %e, "recording failed"),
            }
        })
}
