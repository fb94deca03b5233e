//! Broadcast distributor: the single choke point every notification and
//! chunk passes through.
//!
//! Push delivery offers each event to every eligible session's bounded
//! outbox and never waits. A session whose outbox refuses an event (queue
//! full, byte backlog over the limit, receiver gone) is removed from the
//! registry on the spot; reconnecting is the client's business.
//!
//! Pull delivery lives in [`pull`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};
use crate::event::Event;
use crate::session::{Refusal, Registry, Role, Room, Session, SessionId, Subscription};

mod pull;

pub use pull::{PullCursor, Pulled, pull};


#[derive(Debug)]
pub struct Distributor {
    registry: Mutex<Registry>,
    max_backlog_bytes: usize,
}

impl Distributor {
    pub fn new(queue_len: usize, max_backlog_bytes: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::new(queue_len)),
            max_backlog_bytes,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a session and queue `greeting` as its first event.
    pub fn connect(&self, role: Role, greeting: impl FnOnce(SessionId) -> Event) -> Subscription {
        let mut reg = self.registry();
        let sub = reg.connect(role);
        let event = Arc::new(greeting(sub.id()));
        if let Some(session) = reg.get_mut(sub.id()) {
            // A fresh queue always has room for one event.
            let _ = session.offer(&event, self.max_backlog_bytes);
        }
        debug!(session = %sub.id(), ?role, "session connected");
        sub
    }

    pub fn disconnect(&self, id: SessionId) -> bool {
        let removed = self.registry().disconnect(id);
        if removed {
            debug!(session = %id, "session disconnected");
        }
        removed
    }

    pub fn join(&self, id: SessionId, room: Room) -> RelayResult<()> {
        let mut reg = self.registry();
        if !reg.join(id, room.clone()) {
            return Err(RelayError::UnknownSession(id));
        }
        let ack = Arc::new(Event::Joined { room });
        deliver(&mut reg, &ack, self.max_backlog_bytes, |s| s.id == id);
        Ok(())
    }

    pub fn leave(&self, id: SessionId, room: &Room) -> RelayResult<()> {
        if self.registry().leave(id, room) {
            Ok(())
        } else {
            Err(RelayError::UnknownSession(id))
        }
    }

    pub fn role(&self, id: SessionId) -> Option<Role> {
        self.registry().get(id).map(|s| s.role)
    }

    pub fn last_delivered_position(&self, id: SessionId) -> Option<usize> {
        self.registry().get(id).and_then(|s| s.last_delivered_position)
    }

    pub fn session_count(&self) -> usize {
        self.registry().len()
    }

    pub fn members(&self, room: &Room) -> Vec<SessionId> {
        self.registry().members(room)
    }

    /// Broadcast: stream-scoped events go to the stream room, everything
    /// else to every connected session. Returns how many sessions took it.
    pub fn publish(&self, event: Event) -> usize {
        let event = Arc::new(event);
        let stream_only = event.is_stream_scoped();
        let mut reg = self.registry();
        deliver(&mut reg, &event, self.max_backlog_bytes, |s| {
            !stream_only || s.in_room(&Room::Stream)
        })
    }

    /// Targeted delivery to the members of one room.
    pub fn publish_to_room(&self, room: &Room, event: Event) -> usize {
        let event = Arc::new(event);
        let mut reg = self.registry();
        deliver(&mut reg, &event, self.max_backlog_bytes, |s| s.in_room(room))
    }
}

fn deliver(
    reg: &mut Registry,
    event: &Arc<Event>,
    max_backlog_bytes: usize,
    eligible: impl Fn(&Session) -> bool,
) -> usize {
    let mut delivered = 0;
    let mut refused: Vec<(SessionId, Refusal)> = Vec::new();

    for session in reg.sessions_mut() {
        if !eligible(session) {
            continue;
        }
        match session.offer(event, max_backlog_bytes) {
            Ok(()) => delivered += 1,
            Err(reason) => refused.push((session.id, reason)),
        }
    }

    for (id, reason) in refused {
        reg.disconnect(id);
        match reason {
            Refusal::Closed => debug!(session = %id, "session gone, removing"),
            _ => warn!(session = %id, %reason, "dropping slow session"),
        }
    }

    delivered
}
