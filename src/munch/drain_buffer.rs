use crate::source::SourceId;

/// Data pulled from the nested source currently being drained.
///
/// Arrival and forwarding are decoupled: the source fills the buffer as fast
/// as it produces, the pump empties it as fast as the output accepts. Nothing
/// is dropped; a slow consumer makes the buffer grow instead.
#[derive(Debug)]
pub(crate) struct DrainBuffer<T> {
    active: Option<SourceId>,
    data: Vec<Option<T>>,
    cursor: usize,
    done: bool,
}

impl<T> Default for DrainBuffer<T> {
    fn default() -> Self {
        Self {
            active: None,
            data: Vec::new(),
            cursor: 0,
            done: false,
        }
    }
}

impl<T> DrainBuffer<T> {
    pub(crate) fn activate(&mut self, source: SourceId) {
        *self = Self {
            active: Some(source),
            ..Self::default()
        };
    }

    pub(crate) fn active(&self) -> Option<SourceId> {
        self.active
    }

    pub(crate) fn enqueue(&mut self, chunk: T) {
        self.data.push(Some(chunk));
    }

    /// Take the oldest buffered chunk. The storage is compacted whenever the
    /// cursor catches up with the tail.
    pub(crate) fn dequeue(&mut self) -> Option<T> {
        let chunk = self.data.get_mut(self.cursor)?.take();
        self.cursor += 1;
        if self.cursor == self.data.len() {
            self.data.clear();
            self.cursor = 0;
        }
        chunk
    }

    pub(crate) fn has_more(&self) -> bool {
        self.cursor < self.data.len()
    }

    /// The source reported its end. Buffered data is kept.
    pub(crate) fn mark_done(&mut self) {
        self.done = true;
    }

    /// The source is done *and* everything it produced has been taken.
    pub(crate) fn effective_drained(&self) -> bool {
        self.done && !self.has_more()
    }

    /// Return to idle, handing back the identity of the source that was
    /// active.
    pub(crate) fn deactivate(&mut self) -> Option<SourceId> {
        std::mem::take(self).active
    }
}
