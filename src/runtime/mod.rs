use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::library::FileSource;
use crate::pacing::PacingDriver;
use crate::session::Role;
use crate::station::Station;

mod console;
mod logging;
mod recorder;
mod settings;
mod startup;

#[cfg(test)]
mod tests;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();

    let mut print_config = false;
    let mut dir: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--print-config" => print_config = true,
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument `{arg}`").into()),
        }
    }

    if print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    logging::init(&settings.logging);
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }

    let dir = match dir {
        Some(d) => d,
        None => env::current_dir()?,
    };

    let source = Arc::new(FileSource::new(settings.stream.fallback_bitrate_kbps));
    let station = Arc::new(Station::new(&settings, source.clone(), source));

    let admin = station.connect(Role::Admin);
    let admin_id = admin.id();
    startup::seed_playlist(&station, admin_id, &dir, &settings);

    let driver = PacingDriver::spawn(Arc::clone(&station))?;
    let watcher = console::spawn_watcher(Arc::clone(&station), admin)?;
    startup::apply_playback_defaults(&station, admin_id, &settings);

    info!(session = %admin_id, "relay up, reading commands from stdin");
    let result = console::run(&station, admin_id, io::stdin().lock(), io::stdout());

    driver.shutdown();
    let _ = watcher.join();
    info!("relay stopped");

    result.map_err(Into::into)
}
