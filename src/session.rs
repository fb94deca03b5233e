//! Client session registry.
//!
//! Every connected client (listener or admin) owns a bounded outbox. The
//! registry tracks role and room membership; the distributor decides what
//! goes into which outbox.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use serde::Serialize;

use crate::event::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Observes only.
    Listener,
    /// May issue transport and playlist commands.
    Admin,
}

/// A named subscription scope. Only `stream` carries meaning for the relay
/// itself (chunks and heartbeats); other names are free-form groups a
/// transport can target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Room {
    Stream,
    Named(String),
}

impl Room {
    pub fn as_str(&self) -> &str {
        match self {
            Room::Stream => "stream",
            Room::Named(name) => name,
        }
    }
}

impl FromStr for Room {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.eq_ignore_ascii_case("stream") {
            Room::Stream
        } else {
            Room::Named(s.to_string())
        })
    }
}

impl From<Room> for String {
    fn from(room: Room) -> Self {
        room.as_str().to_string()
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an outbox refused an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// Too many queued events.
    QueueFull,
    /// Too many undelivered chunk bytes.
    Backlog,
    /// The receiving side is gone.
    Closed,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Refusal::QueueFull => "queue full",
            Refusal::Backlog => "backlog over limit",
            Refusal::Closed => "receiver closed",
        };
        f.write_str(s)
    }
}

/// Sending half of a session's queue. Never blocks.
#[derive(Debug)]
struct Outbox {
    tx: SyncSender<Arc<Event>>,
    backlog: Arc<AtomicUsize>,
}

impl Outbox {
    fn offer(&self, event: &Arc<Event>, max_backlog: usize) -> Result<(), Refusal> {
        let len = event.payload_len();
        if len > 0 && self.backlog.load(Ordering::Acquire) + len > max_backlog {
            return Err(Refusal::Backlog);
        }
        // Count first so a fast reader can never drive the counter below zero.
        self.backlog.fetch_add(len, Ordering::AcqRel);
        match self.tx.try_send(Arc::clone(event)) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.backlog.fetch_sub(len, Ordering::AcqRel);
                Err(match e {
                    TrySendError::Full(_) => Refusal::QueueFull,
                    TrySendError::Disconnected(_) => Refusal::Closed,
                })
            }
        }
    }
}

/// Receiving half handed to the transport task serving one client.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    rx: Receiver<Arc<Event>>,
    backlog: Arc<AtomicUsize>,
}

impl Subscription {
    pub fn id(&self) -> SessionId {
        self.id
    }

    fn settle(&self, event: Arc<Event>) -> Arc<Event> {
        let len = event.payload_len();
        if len > 0 {
            self.backlog.fetch_sub(len, Ordering::AcqRel);
        }
        event
    }

    /// Next queued event, if any. `None` also once the session was dropped
    /// and its queue drained.
    pub fn try_recv(&self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok().map(|e| self.settle(e))
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Arc<Event>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout).map(|e| self.settle(e))
    }

    /// Everything queued right now.
    pub fn drain(&self) -> Vec<Arc<Event>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Undelivered chunk bytes sitting in this queue.
    pub fn backlog_bytes(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub role: Role,
    pub rooms: HashSet<Room>,
    /// End offset of the last chunk queued to this session.
    pub last_delivered_position: Option<usize>,
    outbox: Outbox,
}

impl Session {
    pub fn in_room(&self, room: &Room) -> bool {
        self.rooms.contains(room)
    }

    pub(crate) fn offer(&mut self, event: &Arc<Event>, max_backlog: usize) -> Result<(), Refusal> {
        self.outbox.offer(event, max_backlog)?;
        if let Event::Chunk(frame) = event.as_ref() {
            self.last_delivered_position = Some(frame.offset + frame.len());
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    next_id: u64,
    queue_len: usize,
}

impl Registry {
    pub fn new(queue_len: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
            queue_len: queue_len.max(1),
        }
    }

    pub fn connect(&mut self, role: Role) -> Subscription {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::sync_channel(self.queue_len);
        let backlog = Arc::new(AtomicUsize::new(0));
        self.sessions.insert(
            id,
            Session {
                id,
                role,
                rooms: HashSet::new(),
                last_delivered_position: None,
                outbox: Outbox {
                    tx,
                    backlog: Arc::clone(&backlog),
                },
            },
        );

        Subscription { id, rx, backlog }
    }

    /// Forget a session. Dropping its outbox closes the subscription.
    pub fn disconnect(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Returns `false` if the session is unknown.
    pub fn join(&mut self, id: SessionId, room: Room) -> bool {
        match self.sessions.get_mut(&id) {
            Some(s) => {
                s.rooms.insert(room);
                true
            }
            None => false,
        }
    }

    pub fn leave(&mut self, id: SessionId, room: &Room) -> bool {
        match self.sessions.get_mut(&id) {
            Some(s) => {
                s.rooms.remove(room);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub(crate) fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn members(&self, room: &Room) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.in_room(room))
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }
}
