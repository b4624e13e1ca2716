use core::fmt;

use slab::Slab;

use crate::source::SourceId;

/// Lifecycle notifications of a [`Munch`][crate::Munch] stream.
///
/// These are informational; they exist so callers can synchronize with the
/// stream from the outside (e.g. wait for a batch to be consumed before
/// queueing the next one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Event {
    /// Every queued chunk was consumed and the queue is ready for a fresh
    /// batch.
    QueueRecycled,
    /// A nested source became the active one.
    Draining {
        /// The source being drained.
        source: SourceId,
    },
    /// All data of a nested source was forwarded.
    SourceDrained {
        /// The source that was drained.
        source: SourceId,
    },
    /// The end of the output was read.
    End,
    /// A nested source error was escalated onto the output.
    Error,
    /// The output was closed. Always the last notification.
    Close,
}

/// A key used to remove an observer from a [`Munch`][crate::Munch] stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverKey(usize);

type Observer = Box<dyn FnMut(&Event)>;

/// Registered observers, notified in registration order.
#[derive(Default)]
pub(crate) struct Observers {
    observers: Slab<Observer>,
}

impl Observers {
    pub(crate) fn insert<F>(&mut self, observer: F) -> ObserverKey
    where
        F: FnMut(&Event) + 'static,
    {
        ObserverKey(self.observers.insert(Box::new(observer)))
    }

    pub(crate) fn remove(&mut self, key: ObserverKey) -> bool {
        self.observers.try_remove(key.0).is_some()
    }

    pub(crate) fn emit(&mut self, event: Event) {
        tracing::trace!(?event, observers = self.observers.len(), "munch event");
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.observers.len())
            .finish()
    }
}
