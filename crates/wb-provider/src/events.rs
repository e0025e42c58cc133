//! # Provider Events
//!
//! Listener list behind `on`/`off`. Listeners run synchronously, in
//! registration order, outside the list lock; a listener may register or
//! remove listeners.

use parking_lot::Mutex;
use shared_types::{DomainValue, MessageType};
use std::sync::Arc;

/// Events a page can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AccountChanged,
    AccountDisconnected,
    ChainChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        Self::AccountChanged,
        Self::AccountDisconnected,
        Self::ChainChanged,
    ];

    #[must_use]
    pub fn message_type(self) -> MessageType {
        match self {
            Self::AccountChanged => MessageType::AccountChanged,
            Self::AccountDisconnected => MessageType::AccountDisconnected,
            Self::ChainChanged => MessageType::ChainChanged,
        }
    }

    #[must_use]
    pub fn from_message_type(message_type: MessageType) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.message_type() == message_type)
    }
}

/// Identifies a registered listener for `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&DomainValue) + Send + Sync>;

#[derive(Default)]
struct Entries {
    next_id: u64,
    listeners: Vec<(ListenerId, EventKind, Listener)>,
}

#[derive(Default)]
pub struct EventListeners {
    entries: Mutex<Entries>,
}

impl EventListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&DomainValue) + Send + Sync + 'static,
    {
        let mut entries = self.entries.lock();
        let id = ListenerId(entries.next_id);
        entries.next_id += 1;
        entries.listeners.push((id, kind, Arc::new(listener)));
        id
    }

    /// Remove one listener. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.listeners.len();
        entries.listeners.retain(|(entry, _, _)| *entry != id);
        entries.listeners.len() != before
    }

    /// Remove the listeners of one kind, or all of them.
    ///
    /// Returns the number removed.
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.listeners.len();
        match kind {
            Some(kind) => entries.listeners.retain(|(_, entry, _)| *entry != kind),
            None => entries.listeners.clear(),
        }
        before - entries.listeners.len()
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.entries
            .lock()
            .listeners
            .iter()
            .filter(|(_, entry, _)| *entry == kind)
            .count()
    }

    /// Call every listener of `kind`. Returns the number called.
    pub fn emit(&self, kind: EventKind, value: &DomainValue) -> usize {
        let listeners: Vec<Listener> = self
            .entries
            .lock()
            .listeners
            .iter()
            .filter(|(_, entry, _)| *entry == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(value);
        }
        listeners.len()
    }
}
