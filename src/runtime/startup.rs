use std::path::Path;

use tracing::{info, warn};

use crate::config;
use crate::library::scan;
use crate::playback::Command;
use crate::session::SessionId;
use crate::station::Station;

/// Fill the playlist from the music directory. Files that fail to add are
/// skipped. Returns how many tracks made it in.
pub fn seed_playlist(
    station: &Station,
    admin: SessionId,
    dir: &Path,
    settings: &config::Settings,
) -> usize {
    let files = scan(dir, &settings.library);
    let mut added = 0;
    for path in &files {
        match station.add_track(admin, path) {
            Ok(_) => added += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "skipping file"),
        }
    }
    info!(dir = %dir.display(), found = files.len(), added, "library scanned");
    added
}

/// Start playing right away when configured to and there is something to play.
pub fn apply_playback_defaults(station: &Station, admin: SessionId, settings: &config::Settings) {
    if !settings.playback.autoplay {
        return;
    }
    if station.playlist().playlist.is_empty() {
        info!("autoplay requested but the playlist is empty");
        return;
    }
    if let Err(e) = station.command(admin, Command::Play) {
        warn!(error = %e, "autoplay failed");
    }
}
