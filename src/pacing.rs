//! The pacing driver: the only thing that moves the play cursor forward.
//!
//! One background thread per station. While playing it emits one chunk,
//! then sleeps for that chunk's real-time length (anchored to the previous
//! deadline so scheduling jitter does not accumulate). While paused or
//! stopped it emits heartbeats. Any playback change wakes it early, but only
//! a new stream (track load or stop) cancels the time still owed to the last
//! chunk.

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::station::{Station, Wake};

/// How far behind schedule the driver may fall before it stops trying to
/// catch up and re-anchors on the current time.
const MAX_LAG: Duration = Duration::from_millis(500);

pub struct PacingDriver {
    station: Arc<Station>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PacingDriver {
    pub fn spawn(station: Arc<Station>) -> io::Result<Self> {
        let worker = Arc::clone(&station);
        let handle = thread::Builder::new()
            .name("onair-pacing".into())
            .spawn(move || run(&worker))?;

        Ok(Self {
            station,
            join: Mutex::new(Some(handle)),
        })
    }

    /// Stop the driver and wait for its thread to exit.
    pub fn shutdown(&self) {
        self.station.shutdown();

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for PacingDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Real time still owed to the last emitted chunk of stream `epoch`.
#[derive(Debug, Copy, Clone)]
struct Owed {
    epoch: u64,
    clock: Clock,
}

#[derive(Debug, Copy, Clone)]
enum Clock {
    /// Playing: the next chunk may go out at this instant.
    Due(Instant),
    /// Paused: this much of the last chunk is still unplayed.
    Held(Duration),
}

impl Owed {
    fn sync(&mut self, playing: bool, now: Instant) {
        self.clock = match (self.clock, playing) {
            (Clock::Due(due), false) => Clock::Held(due.saturating_duration_since(now)),
            (Clock::Held(left), true) => Clock::Due(now + left),
            (clock, _) => clock,
        };
    }
}

/// Waits out one idle interval, sending a heartbeat if nothing changed.
/// Returns false once the station shuts down.
fn idle(station: &Station, generation: u64) -> bool {
    let deadline = Instant::now() + station.heartbeat_interval();
    match station.wait_for_change(generation, deadline) {
        Wake::Timeout => station.heartbeat(),
        Wake::Changed => debug!("playback changed, re-evaluating"),
        Wake::Shutdown => return false,
    }
    true
}

fn run(station: &Station) {
    info!("pacing driver started");

    // Cleared whenever the stream restarts (track load or stop); a pause
    // only freezes it, so resuming cannot skip ahead of real time.
    let mut owed: Option<Owed> = None;

    while !station.is_shut_down() {
        let marks = station.marks();
        let now = Instant::now();

        owed = owed.filter(|o| o.epoch == marks.epoch);
        if let Some(o) = owed.as_mut() {
            o.sync(marks.playing, now);
        }
        match owed.map(|o| o.clock) {
            Some(Clock::Due(due)) if now < due => {
                if station.wait_for_change(marks.generation, due) == Wake::Shutdown {
                    break;
                }
                continue;
            }
            // Paused mid-chunk: nothing may go out until play resumes.
            Some(Clock::Held(_)) => {
                if !idle(station, marks.generation) {
                    break;
                }
                continue;
            }
            _ => {}
        }

        let tick = station.advance();
        match tick.interval {
            Some(interval) => {
                let now = Instant::now();
                let base = match owed {
                    Some(Owed {
                        clock: Clock::Due(due),
                        ..
                    }) if now.saturating_duration_since(due) <= MAX_LAG => due,
                    _ => now,
                };
                owed = Some(Owed {
                    epoch: tick.epoch,
                    clock: Clock::Due(base + interval),
                });
            }
            None => {
                if !idle(station, tick.generation) {
                    break;
                }
            }
        }
    }

    info!("pacing driver stopped");
}
