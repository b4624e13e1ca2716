use crate::chunk::Chunk;

use super::event::{Event, Observers};

/// The ordered, appendable list of chunks not yet processed.
///
/// Appends go to the tail; the pump consumes from a cursor at the head. Once
/// the cursor catches up with the tail the storage is recycled.
pub(crate) struct SourceQueue<T, E> {
    chunks: Vec<Option<Chunk<T, E>>>,
    cursor: usize,
}

impl<T, E> SourceQueue<T, E> {
    pub(crate) fn new(chunks: impl IntoIterator<Item = Chunk<T, E>>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Some).collect(),
            cursor: 0,
        }
    }

    pub(crate) fn append(&mut self, chunks: impl IntoIterator<Item = Chunk<T, E>>) {
        self.chunks.extend(chunks.into_iter().map(Some));
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.chunks.is_empty() && self.cursor < self.chunks.len()
    }

    /// Take the chunk under the cursor, leaving its slot empty.
    pub(crate) fn take_next(&mut self) -> Option<Chunk<T, E>> {
        let chunk = self.chunks.get_mut(self.cursor)?.take();
        self.cursor += 1;
        chunk
    }

    /// Skip everything still queued. Skipped chunks are dropped on the next
    /// reset.
    pub(crate) fn skip_to_end(&mut self) {
        self.cursor = self.chunks.len();
    }

    pub(crate) fn reset_if_exhausted(&mut self, observers: &mut Observers) {
        if !self.has_pending() {
            self.reset(observers);
        }
    }

    /// Empty the queue. Announces [`Event::QueueRecycled`] if anything had
    /// been consumed since the last reset.
    pub(crate) fn reset(&mut self, observers: &mut Observers) {
        let consumed = self.cursor;
        self.chunks = Vec::new();
        self.cursor = 0;
        if consumed > 0 {
            tracing::trace!(consumed, "source queue recycled");
            observers.emit(Event::QueueRecycled);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len() - self.cursor
    }
}
