use core::fmt;

use futures_core::Stream;

use crate::source::Source;

/// One entry in the queue of a [`Munch`][crate::Munch] stream.
pub enum Chunk<T, E> {
    /// Data forwarded as-is.
    Literal(T),
    /// A nested source, drained completely before the next chunk is looked at.
    Source(Source<T, E>),
    /// Terminates the combined output here, regardless of what is queued
    /// behind it.
    End,
}

impl<T, E> Chunk<T, E> {
    /// A chunk of literal data.
    pub fn literal(data: T) -> Self {
        Chunk::Literal(data)
    }

    /// A nested source.
    ///
    /// Anything that yields `Result<T, E>` qualifies: `Ok` items are data,
    /// the first `Err` is the source's failure, and the end of the stream is
    /// the end of its data.
    pub fn source<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + 'static,
    {
        Chunk::Source(Source::new(stream))
    }

    /// Returns `true` if this chunk is a nested source.
    pub fn is_source(&self) -> bool {
        matches!(self, Chunk::Source(_))
    }

    /// Returns `true` if this chunk is the end marker.
    pub fn is_end(&self) -> bool {
        matches!(self, Chunk::End)
    }
}

impl<T, E> From<Source<T, E>> for Chunk<T, E> {
    fn from(source: Source<T, E>) -> Self {
        Chunk::Source(source)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Chunk<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::Literal(data) => f.debug_tuple("Literal").field(data).finish(),
            Chunk::Source(source) => f.debug_tuple("Source").field(source).finish(),
            Chunk::End => f.write_str("End"),
        }
    }
}
