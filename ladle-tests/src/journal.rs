use ladle_core::lock;
use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
};

pub type ConnectionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Grab(ConnectionId),
    Release(ConnectionId),
    /// The cancellation hook of the cursor opened on that connection was invoked.
    CancelStarted(ConnectionId),
    /// The cancellation hook completed.
    CancelFinished(ConnectionId),
    /// The driver cursor was dropped.
    Dropped(ConnectionId),
}

/// Ordered record of everything that happened to the connections of a [`TestPool`](crate::TestPool).
#[derive(Debug, Default)]
pub struct Journal {
    next_id: AtomicU32,
    events: Mutex<Vec<Event>>,
}

impl Journal {
    pub(crate) fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn push(&self, event: Event) {
        log::trace!("{:?}", event);
        lock(&self.events).push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        lock(&self.events).iter().filter(|e| predicate(*e)).count()
    }

    pub fn grabs(&self) -> usize {
        self.count(|e| matches!(e, Event::Grab(..)))
    }

    pub fn releases(&self) -> usize {
        self.count(|e| matches!(e, Event::Release(..)))
    }

    pub fn releases_of(&self, id: ConnectionId) -> usize {
        self.count(|e| *e == Event::Release(id))
    }

    /// Connections grabbed and not yet released.
    pub fn outstanding(&self) -> usize {
        self.grabs() - self.releases()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        lock(&self.events).iter().position(|e| *e == event)
    }
}
