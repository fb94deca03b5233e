//! The relay context.
//!
//! A `Station` is built once at startup and shared as `Arc<Station>` with the
//! pacing driver and every client task. It owns the one lock around the
//! playlist and play cursor. Every mutation and every publish happens while
//! that lock is held, so all sessions observe the same ordered history.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::distributor::{Distributor, PullCursor, Pulled, pull};
use crate::error::{RelayError, RelayResult};
use crate::event::{Event, PlaylistView, Snapshot};
use crate::library::{ByteProvider, MetadataProvider, TrackId};
use crate::playback::{Command, LoopMode, Outcome, Phase, PlaybackMachine};
use crate::session::{Role, Room, SessionId, Subscription};

#[cfg(test)]
mod tests;

/// Result of one pacing step, as seen by the driver.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Tick {
    pub interval: Option<Duration>,
    pub generation: u64,
    /// Epoch of the stream the emitted chunk belongs to.
    pub epoch: u64,
}

/// Where playback stands, as far as the driver's clock is concerned.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Marks {
    pub generation: u64,
    pub epoch: u64,
    pub playing: bool,
}

/// Why a driver wait ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Wake {
    Timeout,
    Changed,
    Shutdown,
}

pub struct Station {
    machine: Mutex<PlaybackMachine>,
    changed: Condvar,
    distributor: Distributor,
    bytes: Arc<dyn ByteProvider>,
    tags: Arc<dyn MetadataProvider>,
    heartbeat_every: Duration,
    pull_wait: Duration,
    shutdown: AtomicBool,
}

impl Station {
    pub fn new(
        settings: &Settings,
        bytes: Arc<dyn ByteProvider>,
        tags: Arc<dyn MetadataProvider>,
    ) -> Self {
        let stream = &settings.stream;
        Self {
            machine: Mutex::new(PlaybackMachine::new(
                stream.chunk_size,
                LoopMode::from(settings.playback.loop_mode),
            )),
            changed: Condvar::new(),
            distributor: Distributor::new(stream.subscriber_queue_len, stream.max_backlog_bytes),
            bytes,
            tags,
            heartbeat_every: Duration::from_millis(stream.idle_heartbeat_ms.max(1)),
            pull_wait: Duration::from_millis(stream.pull_wait_ms),
            shutdown: AtomicBool::new(false),
        }
    }

    fn machine(&self) -> MutexGuard<'_, PlaybackMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish in order and wake everyone waiting on the cursor. The caller
    /// must still hold the machine lock.
    fn commit(&self, _held: &MutexGuard<'_, PlaybackMachine>, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            self.distributor.publish(event);
        }
        self.changed.notify_all();
    }

    fn authorize(&self, session: SessionId) -> RelayResult<()> {
        match self.distributor.role(session) {
            Some(Role::Admin) => Ok(()),
            Some(Role::Listener) => Err(RelayError::Forbidden(session)),
            None => Err(RelayError::UnknownSession(session)),
        }
    }

    // -- sessions ---------------------------------------------------------

    /// Attach a client. Its first event is a `connected` greeting carrying
    /// the state at the moment of registration; nothing published later can
    /// be missed or precede it.
    pub fn connect(&self, role: Role) -> Subscription {
        let m = self.machine();
        let state = m.state();
        let current_track = state
            .current_index
            .filter(|_| state.loaded.is_some())
            .and_then(|i| m.playlist().get(i))
            .cloned();
        let phase = state.phase;

        self.distributor.connect(role, |session| Event::Connected {
            session,
            current_track,
            phase,
            is_playing: phase == Phase::Playing,
        })
    }

    pub fn disconnect(&self, session: SessionId) -> bool {
        self.distributor.disconnect(session)
    }

    pub fn join_room(&self, session: SessionId, room: Room) -> RelayResult<()> {
        self.distributor.join(session, room)
    }

    pub fn leave_room(&self, session: SessionId, room: &Room) -> RelayResult<()> {
        self.distributor.leave(session, room)
    }

    /// Send `event` to the members of `room` only.
    pub fn publish_to_room(&self, room: &Room, event: Event) -> usize {
        let _held = self.machine();
        self.distributor.publish_to_room(room, event)
    }

    pub fn session_count(&self) -> usize {
        self.distributor.session_count()
    }

    pub fn last_delivered_position(&self, session: SessionId) -> Option<usize> {
        self.distributor.last_delivered_position(session)
    }

    /// Snapshot for a late-joining or reconnecting session.
    pub fn request_sync(&self, session: SessionId) -> RelayResult<Snapshot> {
        if self.distributor.role(session).is_none() {
            return Err(RelayError::UnknownSession(session));
        }
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.machine().snapshot()
    }

    pub fn playlist(&self) -> PlaylistView {
        self.machine().playlist_view()
    }

    // -- admin operations -------------------------------------------------

    pub fn command(&self, session: SessionId, cmd: Command) -> RelayResult<Outcome> {
        self.authorize(session)?;

        let mut m = self.machine();
        match m.apply(self.bytes.as_ref(), &cmd) {
            Ok((outcome, events)) => {
                self.commit(&m, events);
                info!(session = %session, ?cmd, ?outcome, "command");
                Ok(outcome)
            }
            Err(e) => {
                warn!(session = %session, ?cmd, error = %e, "command rejected");
                Err(e)
            }
        }
    }

    pub fn add_track(&self, session: SessionId, path: &Path) -> RelayResult<TrackId> {
        self.authorize(session)?;

        let mut m = self.machine();
        let (id, events) = m.add_track(self.bytes.as_ref(), self.tags.as_ref(), path)?;
        self.commit(&m, events);
        info!(session = %session, track = %id, path = %path.display(), "track added");
        Ok(id)
    }

    pub fn remove_track(&self, session: SessionId, id: TrackId) -> RelayResult<()> {
        self.authorize(session)?;

        let mut m = self.machine();
        let events = m.remove_track(self.bytes.as_ref(), id)?;
        self.commit(&m, events);
        info!(session = %session, track = %id, "track removed");
        Ok(())
    }

    // -- pull mode --------------------------------------------------------

    /// Non-blocking read at `cursor`.
    pub fn pull(&self, cursor: &mut PullCursor) -> Pulled {
        let m = self.machine();
        pull(m.state(), cursor, m.chunk_size())
    }

    /// Block until bytes exist at `cursor`, its track ends, or the configured
    /// pull wait elapses (then `Idle`, which a transport may answer with
    /// silence).
    pub fn wait_pull(&self, cursor: &mut PullCursor) -> Pulled {
        self.wait_pull_for(cursor, self.pull_wait)
    }

    pub fn wait_pull_for(&self, cursor: &mut PullCursor, timeout: Duration) -> Pulled {
        let deadline = Instant::now() + timeout;
        let mut m = self.machine();
        loop {
            let got = pull(m.state(), cursor, m.chunk_size());
            if got != Pulled::Idle || self.is_shut_down() {
                return got;
            }
            let now = Instant::now();
            if now >= deadline {
                return Pulled::Idle;
            }
            m = self
                .changed
                .wait_timeout(m, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    // -- pacing hooks -----------------------------------------------------

    pub(crate) fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_every
    }

    pub(crate) fn advance(&self) -> Tick {
        let mut m = self.machine();
        let step = m.advance(self.bytes.as_ref());
        self.commit(&m, step.events);
        Tick {
            interval: step.interval,
            generation: m.generation(),
            epoch: m.state().epoch,
        }
    }

    pub(crate) fn marks(&self) -> Marks {
        let m = self.machine();
        Marks {
            generation: m.generation(),
            epoch: m.state().epoch,
            playing: m.state().phase == Phase::Playing,
        }
    }

    pub(crate) fn heartbeat(&self) {
        let m = self.machine();
        let phase = m.state().phase;
        self.distributor.publish(Event::Heartbeat { phase });
    }

    /// Sleep until `deadline`, returning early if playback changed since
    /// `generation` or the station is shutting down.
    pub(crate) fn wait_for_change(&self, generation: u64, deadline: Instant) -> Wake {
        let mut m = self.machine();
        loop {
            if self.is_shut_down() {
                return Wake::Shutdown;
            }
            if m.generation() != generation {
                return Wake::Changed;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wake::Timeout;
            }
            m = self
                .changed
                .wait_timeout(m, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("station shutting down");
        }
        let _held = self.machine();
        self.changed.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
