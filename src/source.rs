use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::Stream;
use pin_project::pin_project;

/// Something a nested source reported.
///
/// Any `Stream<Item = Result<T, E>>` can act as a nested source: each
/// `Some(Ok(_))` is a data event, `Some(Err(_))` an error event, and `None`
/// the end of its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceEvent<T, E> {
    /// The source produced a chunk of data.
    Data(T),
    /// The source failed. This is terminal.
    Error(E),
    /// The source has no more data. This is terminal.
    End,
}

impl<T, E> SourceEvent<T, E> {
    /// Error and end-of-data both end a subscription.
    pub(crate) fn is_terminal(&self) -> bool {
        !matches!(self, SourceEvent::Data(_))
    }
}

/// Identifies a nested source for as long as it is being drained.
///
/// Ids are handed out in activation order by the stream that drains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub(crate) u64);

impl SourceId {
    /// The activation number of this source, starting at zero.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// The object-safe capability every nested source is erased to.
trait Subscribe<T, E> {
    fn poll_event(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SourceEvent<T, E>>>;
}

/// Wraps a fallible stream and stops listening to it once it reports a
/// terminal event, so data, error and end are never handled twice.
#[pin_project]
struct Listener<S> {
    #[pin]
    stream: S,
    detached: bool,
}

impl<S, T, E> Subscribe<T, E> for Listener<S>
where
    S: Stream<Item = Result<T, E>>,
{
    fn poll_event(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SourceEvent<T, E>>> {
        let this = self.project();
        if *this.detached {
            return Poll::Ready(None);
        }

        let event = match this.stream.poll_next(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(Ok(data))) => SourceEvent::Data(data),
            Poll::Ready(Some(Err(err))) => SourceEvent::Error(err),
            Poll::Ready(None) => SourceEvent::End,
        };
        if event.is_terminal() {
            *this.detached = true;
        }
        Poll::Ready(Some(event))
    }
}

/// A type-erased nested source.
///
/// Created with [`Source::new`] or [`Chunk::source`][crate::Chunk::source].
#[must_use = "a source does nothing unless it is queued on a stream"]
pub struct Source<T, E> {
    inner: Pin<Box<dyn Subscribe<T, E>>>,
}

impl<T, E> Source<T, E> {
    /// Wrap a fallible stream as a nested source.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + 'static,
    {
        Self {
            inner: Box::pin(Listener {
                stream,
                detached: false,
            }),
        }
    }

    /// Poll the source for its next event.
    ///
    /// Returns `Poll::Ready(None)` once a terminal event has been delivered.
    pub(crate) fn poll_event(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<SourceEvent<T, E>>> {
        self.inner.as_mut().poll_event(cx)
    }
}

impl<T, E> fmt::Debug for Source<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").finish_non_exhaustive()
    }
}
