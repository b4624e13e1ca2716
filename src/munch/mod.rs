//! The combinator and its builder.
//!
//! A [`Munch`] owns a queue of [`Chunk`]s and a buffer for the nested source
//! being drained. Every poll runs the pump: forward what the active source
//! buffered, then advance through the queue until the output saturates, a
//! nested source has to be waited on, or the end marker is reached.

mod drain_buffer;
mod event;
mod outlet;
mod schedule;
mod source_queue;

pub use event::{Event, ObserverKey};

use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::stream::{FusedStream, Stream};

use crate::chunk::Chunk;
use crate::completion::Completion;
use crate::error::Error;
use crate::source::{Source, SourceEvent, SourceId};

use drain_buffer::DrainBuffer;
use event::Observers;
use outlet::Outlet;
use schedule::Schedule;
use source_queue::SourceQueue;

/// What to do about a nested source that failed.
///
/// Returned by the handler passed to [`MunchBuilder::on_source_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Containment<T> {
    substitute: Option<T>,
    remit: bool,
}

impl<T> Containment<T> {
    /// Raise the error on the combined output and destroy it.
    pub fn escalate() -> Self {
        Self {
            substitute: None,
            remit: true,
        }
    }

    /// Discard the error and carry on as if the source had ended normally.
    pub fn suppress() -> Self {
        Self {
            substitute: None,
            remit: false,
        }
    }

    /// Forward `data` as the source's last chunk.
    pub fn with_substitute(mut self, data: T) -> Self {
        self.substitute = Some(data);
        self
    }

    /// Whether the error will be raised on the output.
    pub fn remits(&self) -> bool {
        self.remit
    }
}

impl<T> Default for Containment<T> {
    fn default() -> Self {
        Self::escalate()
    }
}

type ErrorHandler<T, E> = Box<dyn FnMut(&E) -> Containment<T>>;

/// Configures a [`Munch`] stream.
///
/// # Example
///
/// ```rust
/// use futures_lite::{future::block_on, stream, StreamExt};
/// use stream_munch::{Chunk, Containment, Munch};
///
/// # block_on(async {
/// let flaky = stream::iter(vec![Ok("partial "), Err("lost connection")]);
/// let munch = Munch::builder()
///     .high_water_mark(4)
///     .on_source_error(|_err: &&str| Containment::suppress().with_substitute("[retry later]"))
///     .build([Chunk::source(flaky), Chunk::End]);
///
/// let out: Vec<_> = munch.map(Result::unwrap).collect().await;
/// assert_eq!(out, ["partial ", "[retry later]"]);
/// # });
/// ```
pub struct MunchBuilder<T, E> {
    on_source_error: Option<ErrorHandler<T, E>>,
    high_water_mark: usize,
    source_budget: usize,
    completion: Completion,
}

impl<T, E> MunchBuilder<T, E> {
    /// How many chunks the output buffers before it reports saturation.
    pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

    /// How many events of a nested source are taken per poll.
    pub const DEFAULT_SOURCE_BUDGET: usize = 32;

    fn new() -> Self {
        Self {
            on_source_error: None,
            high_water_mark: Self::DEFAULT_HIGH_WATER_MARK,
            source_budget: Self::DEFAULT_SOURCE_BUDGET,
            completion: Completion::default(),
        }
    }

    /// Decide what happens when a nested source fails. Without a handler
    /// every failure is escalated.
    pub fn on_source_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&E) -> Containment<T> + 'static,
    {
        self.on_source_error = Some(Box::new(handler));
        self
    }

    /// Set how many chunks the output buffers before the pump pauses.
    pub fn high_water_mark(mut self, chunks: usize) -> Self {
        self.high_water_mark = chunks;
        self
    }

    /// Cap the events taken from a nested source in a single poll. A source
    /// that is always ready yields to the executor once the budget is spent.
    pub fn source_budget(mut self, events: usize) -> Self {
        self.source_budget = events.max(1);
        self
    }

    /// Set the completion policy of the host.
    pub fn completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Build the stream with an initial list of chunks.
    pub fn build<I>(self, chunks: I) -> Munch<T, E>
    where
        I: IntoIterator<Item = Chunk<T, E>>,
    {
        Munch {
            queue: SourceQueue::new(chunks),
            drain: DrainBuffer::default(),
            active: None,
            outlet: Outlet::new(self.high_water_mark, self.completion),
            schedule: Schedule::default(),
            observers: Observers::default(),
            on_source_error: self.on_source_error,
            completion: self.completion,
            source_budget: self.source_budget,
            next_source: 0,
            started: false,
            destroyed: false,
            last_error: None,
        }
    }
}

impl<T, E> fmt::Debug for MunchBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MunchBuilder")
            .field("on_source_error", &self.on_source_error.is_some())
            .field("high_water_mark", &self.high_water_mark)
            .field("source_budget", &self.source_budget)
            .field("completion", &self.completion)
            .finish()
    }
}

/// A stream over literal chunks and nested sources, in order.
///
/// Chunks can be appended at any time with [`munch`]. Nested sources are
/// drained one at a time: everything a source produces is forwarded before
/// the next chunk in the queue is looked at. [`Chunk::End`] terminates the
/// output.
///
/// The stream yields `Err` when a nested source fails and the error is
/// escalated, and when it is used after being destroyed.
///
/// [`munch`]: Munch::munch
///
/// # Example
///
/// ```rust
/// use futures_lite::{future::block_on, stream, StreamExt};
/// use stream_munch::{Chunk, Munch};
///
/// # block_on(async {
/// let world = stream::once(Ok::<_, std::io::Error>("world"));
/// let munch = Munch::new([
///     Chunk::literal("hello "),
///     Chunk::source(world),
///     Chunk::literal("!"),
///     Chunk::End,
/// ]);
///
/// let out: Vec<_> = munch.map(Result::unwrap).collect().await;
/// assert_eq!(out.concat(), "hello world!");
/// # });
/// ```
#[must_use = "streams do nothing unless polled"]
pub struct Munch<T, E> {
    queue: SourceQueue<T, E>,
    drain: DrainBuffer<T>,
    active: Option<Source<T, E>>,
    outlet: Outlet<T, E>,
    schedule: Schedule,
    observers: Observers,
    on_source_error: Option<ErrorHandler<T, E>>,
    completion: Completion,
    source_budget: usize,
    next_source: u64,
    started: bool,
    destroyed: bool,
    last_error: Option<E>,
}

// No field is ever pinned: nested sources are pinned in their own boxes.
impl<T, E> Unpin for Munch<T, E> {}

impl<T, E> Munch<T, E> {
    /// Create a stream with the default configuration.
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Chunk<T, E>>,
    {
        Self::builder().build(chunks)
    }

    /// Configure a new stream.
    pub fn builder() -> MunchBuilder<T, E> {
        MunchBuilder::new()
    }

    /// Append chunks to the queue, waking the stream if it went idle.
    ///
    /// After the stream was destroyed the chunks are dropped and the next
    /// poll yields [`Error::MunchAfterDestroy`]. Until that error has been
    /// read, [`is_terminated`] reports `false` again.
    ///
    /// [`is_terminated`]: FusedStream::is_terminated
    pub fn munch<I>(&mut self, chunks: I) -> &mut Self
    where
        I: IntoIterator<Item = Chunk<T, E>>,
    {
        let mut chunks = chunks.into_iter().peekable();
        if chunks.peek().is_none() {
            return self;
        }

        if self.destroyed {
            tracing::warn!("munch called after destroy, discarding chunks");
            self.outlet.fail(Error::MunchAfterDestroy);
            self.schedule.schedule();
            return self;
        }

        self.queue.append(chunks);
        self.trigger_read();
        self
    }

    /// Tear the stream down: drop everything queued, stop listening to the
    /// active nested source and close the output.
    ///
    /// Chunks not yet read are discarded, unless the end marker or an
    /// escalated source error was reached before. The next poll yields
    /// `None`; polls after that yield [`Error::PullAfterDestroy`].
    ///
    /// Calling this more than once has no further effect.
    pub fn destroy(&mut self) {
        self.teardown();
        if self.outlet.destroy() {
            tracing::debug!("munch stream destroyed");
            if self.completion.emit_close {
                self.outlet.synthesize_close();
            }
        }
        self.outlet.flush_close(&mut self.observers);
        self.schedule.schedule();
    }

    /// Register an observer for lifecycle [`Event`]s.
    pub fn observe<F>(&mut self, observer: F) -> ObserverKey
    where
        F: FnMut(&Event) + 'static,
    {
        self.observers.insert(observer)
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unobserve(&mut self, key: ObserverKey) -> bool {
        self.observers.remove(key)
    }

    /// Whether the stream has been polled at least once.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the stream reached its end marker, failed, or was destroyed.
    /// Chunks that were already forwarded can still be read.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The nested source currently being drained.
    pub fn draining(&self) -> Option<SourceId> {
        self.drain.active()
    }

    /// How many chunks are queued and not yet looked at.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// The last nested source error that was suppressed by the error handler.
    pub fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }

    fn teardown(&mut self) {
        self.queue.reset(&mut self.observers);
        self.active = None;
        self.drain.deactivate();
        self.destroyed = true;
    }

    /// Schedule a continuation if there is anything left to forward.
    fn trigger_read(&mut self) {
        if self.started && (self.drain.has_more() || self.queue.has_pending()) {
            self.schedule.schedule();
        }
    }

    fn read(&mut self, cx: &mut Context<'_>) {
        self.started = true;

        if self.drain.active().is_some() {
            self.listen(cx);
            if self.destroyed {
                return;
            }

            while let Some(chunk) = self.drain.dequeue() {
                if !self.outlet.push(chunk) {
                    break;
                }
            }
            if !self.drain.effective_drained() {
                return;
            }

            if let Some(source) = self.drain.deactivate() {
                tracing::debug!(%source, "nested source drained");
                self.observers.emit(Event::SourceDrained { source });
            }
        }

        while let Some(chunk) = self.queue.take_next() {
            match chunk {
                Chunk::End => {
                    self.end_of_data();
                    break;
                }
                Chunk::Source(source) => {
                    self.attach(source, cx);
                    break;
                }
                Chunk::Literal(data) => {
                    if !self.outlet.push(data) {
                        break;
                    }
                }
            }
        }

        self.queue.reset_if_exhausted(&mut self.observers);
    }

    fn end_of_data(&mut self) {
        tracing::debug!(skipped = self.queue.len(), "end marker reached");
        self.queue.skip_to_end();
        self.outlet.end();
        self.teardown();
        if self.completion.should_destroy {
            self.outlet.destroy();
        }
        if self.completion.emit_close {
            self.outlet.synthesize_close();
        }
    }

    fn attach(&mut self, source: Source<T, E>, cx: &mut Context<'_>) {
        let id = SourceId(self.next_source);
        self.next_source += 1;

        self.drain.activate(id);
        self.active = Some(source);
        tracing::debug!(source = %id, "draining nested source");
        self.observers.emit(Event::Draining { source: id });

        // Poll right away so the source knows whom to wake.
        self.listen(cx);
    }

    /// Take the events the active source has ready, within budget.
    fn listen(&mut self, cx: &mut Context<'_>) {
        let mut budget = self.source_budget;
        while let Some(source) = self.active.as_mut() {
            if budget == 0 {
                self.schedule.schedule();
                return;
            }
            budget -= 1;

            match source.poll_event(cx) {
                Poll::Pending => return,
                Poll::Ready(Some(SourceEvent::Data(data))) => {
                    self.drain.enqueue(data);
                    self.trigger_read();
                }
                Poll::Ready(Some(SourceEvent::End)) | Poll::Ready(None) => {
                    self.active = None;
                    self.drain.mark_done();
                    self.trigger_read();
                }
                Poll::Ready(Some(SourceEvent::Error(err))) => {
                    self.active = None;
                    self.contain(err);
                }
            }
        }
    }

    fn contain(&mut self, err: E) {
        let Containment { substitute, remit } = match self.on_source_error.as_mut() {
            Some(handler) => handler(&err),
            None => Containment::escalate(),
        };

        if remit {
            tracing::warn!(source = ?self.drain.active(), "nested source failed");
            // Whatever the source sent before failing is still forwarded.
            while let Some(chunk) = self.drain.dequeue() {
                self.outlet.push(chunk);
            }
            if substitute.is_some() {
                tracing::trace!("substitute dropped with the escalated error");
            }
            self.outlet.abort(Error::Source(err));
            self.observers.emit(Event::Error);
            self.destroy();
        } else {
            if let Some(data) = substitute {
                self.drain.enqueue(data);
            }
            tracing::debug!(source = ?self.drain.active(), "nested source error suppressed");
            self.last_error = Some(err);
            self.drain.mark_done();
            self.trigger_read();
        }
    }
}

impl<T, E> Stream for Munch<T, E> {
    type Item = Result<T, Error<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.schedule.enter(cx.waker());

        if let Some(err) = this.outlet.take_error() {
            return Poll::Ready(Some(Err(err)));
        }
        if this.outlet.is_finished() {
            tracing::warn!("munch stream polled after destroy");
            return Poll::Ready(Some(Err(Error::PullAfterDestroy)));
        }

        if !this.destroyed {
            if this.outlet.wants_more() {
                this.read(cx);
            } else {
                this.listen(cx);
            }
        }

        if let Some(err) = this.outlet.take_error() {
            return Poll::Ready(Some(Err(err)));
        }
        if let Some(chunk) = this.outlet.pop() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if let Some(err) = this.outlet.take_failure() {
            return Poll::Ready(Some(Err(err)));
        }
        if this.outlet.finish(&mut this.observers) {
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

impl<T, E> FusedStream for Munch<T, E> {
    fn is_terminated(&self) -> bool {
        self.outlet.is_finished() && !self.outlet.has_errors()
    }
}

impl<T, E> FromIterator<Chunk<T, E>> for Munch<T, E> {
    fn from_iter<I: IntoIterator<Item = Chunk<T, E>>>(chunks: I) -> Self {
        Munch::new(chunks)
    }
}

impl<T, E> fmt::Debug for Munch<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Munch")
            .field("queued", &self.queue.len())
            .field("draining", &self.drain.active())
            .field("buffered", &self.outlet.len())
            .field("started", &self.started)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// Turn a list of chunks into a [`Munch`] stream.
pub trait IntoMunch {
    /// The literal data type.
    type Item;

    /// The error type of nested sources.
    type Error;

    /// Build a stream over these chunks with the default configuration.
    fn into_munch(self) -> Munch<Self::Item, Self::Error>;
}

impl<T, E> IntoMunch for Vec<Chunk<T, E>> {
    type Item = T;
    type Error = E;

    fn into_munch(self) -> Munch<T, E> {
        Munch::new(self)
    }
}

impl<T, E, const N: usize> IntoMunch for [Chunk<T, E>; N] {
    type Item = T;
    type Error = E;

    fn into_munch(self) -> Munch<T, E> {
        Munch::new(self)
    }
}
