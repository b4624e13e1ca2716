use std::collections::VecDeque;

use crate::completion::Completion;
use crate::error::Error;

use super::event::{Event, Observers};

/// The readable side of a [`Munch`][crate::Munch] stream.
///
/// The pump pushes into it; `poll_next` reads out of it. A push reports
/// whether the outlet still wants more, which is how downstream backpressure
/// reaches the pump.
#[derive(Debug)]
pub(crate) struct Outlet<T, E> {
    buffer: VecDeque<T>,
    errors: VecDeque<Error<E>>,
    failure: Option<Error<E>>,
    high_water_mark: usize,
    ended: bool,
    destroyed: bool,
    finished: bool,
    close_pending: bool,
    closed: bool,
    closes_on_teardown: bool,
    tears_down_on_end: bool,
}

impl<T, E> Outlet<T, E> {
    pub(crate) fn new(high_water_mark: usize, completion: Completion) -> Self {
        Self {
            buffer: VecDeque::new(),
            errors: VecDeque::new(),
            failure: None,
            high_water_mark,
            ended: false,
            destroyed: false,
            finished: false,
            close_pending: false,
            closed: false,
            closes_on_teardown: completion.closes_on_teardown(),
            tears_down_on_end: completion.tears_down_on_end(),
        }
    }

    /// Buffer one chunk. Returns `false` once the outlet is saturated; the
    /// chunk is kept regardless, unless the outlet already ended.
    pub(crate) fn push(&mut self, chunk: T) -> bool {
        if self.ended || self.destroyed || self.failure.is_some() {
            tracing::trace!("outlet dropped a push after its end");
            return false;
        }
        self.buffer.push_back(chunk);
        self.buffer.len() < self.high_water_mark
    }

    /// Whether the pump should run to refill the outlet.
    pub(crate) fn wants_more(&self) -> bool {
        self.buffer.is_empty() || self.buffer.len() < self.high_water_mark
    }

    /// Signal the end of data. Buffered chunks are still delivered.
    pub(crate) fn end(&mut self) {
        self.ended = true;
    }

    /// Queue an error for delivery on the next poll.
    pub(crate) fn fail(&mut self, err: Error<E>) {
        self.errors.push_back(err);
    }

    /// End the output with `err`, delivered once every buffered chunk has
    /// been read. Buffered chunks survive a later teardown.
    pub(crate) fn abort(&mut self, err: Error<E>) {
        self.failure = Some(err);
    }

    /// Take the terminal error once the buffer has been read.
    pub(crate) fn take_failure(&mut self) -> Option<Error<E>> {
        if self.buffer.is_empty() {
            self.failure.take()
        } else {
            None
        }
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.failure.is_some()
    }

    /// Tear the outlet down. Unread chunks are discarded unless the end of
    /// data or a terminal error was already signalled. Returns `false` if it
    /// was torn down before.
    pub(crate) fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        if !self.ended && self.failure.is_none() {
            self.buffer.clear();
        }
        if self.closes_on_teardown {
            self.close_pending = true;
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Announce `Close` once the outlet finishes, for hosts that don't.
    pub(crate) fn synthesize_close(&mut self) {
        self.close_pending = true;
    }

    pub(crate) fn take_error(&mut self) -> Option<Error<E>> {
        self.errors.pop_front()
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    /// The terminal `None` has been handed to the consumer.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move to the finished state if everything has been read and no more
    /// data can arrive. Returns whether the outlet is finished.
    pub(crate) fn finish(&mut self, observers: &mut Observers) -> bool {
        if self.finished {
            return true;
        }
        let drained = self.buffer.is_empty() && self.failure.is_none();
        if !drained || !(self.ended || self.destroyed) {
            return false;
        }

        self.finished = true;
        if self.ended {
            observers.emit(Event::End);
            if self.tears_down_on_end {
                self.destroy();
            }
        }
        self.flush_close(observers);
        true
    }

    /// Announce a pending `Close`, at most once and only after the terminal
    /// `None` was delivered.
    pub(crate) fn flush_close(&mut self, observers: &mut Observers) {
        if self.finished && self.close_pending && !self.closed {
            self.closed = true;
            observers.emit(Event::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(observers: &mut Observers) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(vec![]));
        let log = seen.clone();
        observers.insert(move |event| log.borrow_mut().push(*event));
        seen
    }

    #[test]
    fn push_reports_saturation() {
        let mut outlet: Outlet<u8, ()> = Outlet::new(2, Completion::MODERN);
        assert!(outlet.push(1));
        assert!(!outlet.push(2));
        assert!(!outlet.wants_more());
        // Saturation never loses the chunk.
        assert!(!outlet.push(3));
        assert_eq!(outlet.len(), 3);

        assert_eq!(outlet.pop(), Some(1));
        assert_eq!(outlet.pop(), Some(2));
        assert!(outlet.wants_more());
    }

    #[test]
    fn zero_high_water_mark_still_buffers() {
        let mut outlet: Outlet<u8, ()> = Outlet::new(0, Completion::MODERN);
        assert!(outlet.wants_more());
        assert!(!outlet.push(1));
        assert_eq!(outlet.pop(), Some(1));
    }

    #[test]
    fn end_keeps_buffered_data() {
        let mut observers = Observers::default();
        let seen = record(&mut observers);
        let mut outlet: Outlet<u8, ()> = Outlet::new(16, Completion::MODERN);

        outlet.push(1);
        outlet.end();
        assert!(!outlet.push(2));
        assert!(!outlet.finish(&mut observers));
        assert_eq!(outlet.pop(), Some(1));
        assert!(outlet.finish(&mut observers));
        assert!(outlet.is_destroyed());
        assert_eq!(*seen.borrow(), vec![Event::End, Event::Close]);
    }

    #[test]
    fn destroy_discards_unread_data() {
        let mut observers = Observers::default();
        let seen = record(&mut observers);
        let mut outlet: Outlet<u8, ()> = Outlet::new(16, Completion::MODERN);

        outlet.push(1);
        assert!(outlet.destroy());
        assert!(!outlet.destroy());
        assert_eq!(outlet.pop(), None);
        assert!(outlet.finish(&mut observers));
        assert_eq!(*seen.borrow(), vec![Event::Close]);
    }

    #[test]
    fn legacy_host_needs_synthesized_close() {
        let mut observers = Observers::default();
        let seen = record(&mut observers);
        let mut outlet: Outlet<u8, ()> = Outlet::new(16, Completion::for_host_version(8));

        outlet.end();
        outlet.destroy();
        assert!(outlet.finish(&mut observers));
        assert_eq!(*seen.borrow(), vec![Event::End]);

        outlet.synthesize_close();
        outlet.flush_close(&mut observers);
        outlet.flush_close(&mut observers);
        assert_eq!(*seen.borrow(), vec![Event::End, Event::Close]);
    }

    #[test]
    fn abort_delivers_after_buffered_data() {
        let mut observers = Observers::default();
        let seen = record(&mut observers);
        let mut outlet: Outlet<u8, &str> = Outlet::new(16, Completion::MODERN);

        outlet.push(1);
        outlet.push(2);
        outlet.abort(Error::Source("boom"));
        assert!(!outlet.push(3));
        assert!(outlet.destroy());
        assert!(outlet.has_errors());

        assert!(outlet.take_failure().is_none());
        assert_eq!(outlet.pop(), Some(1));
        assert_eq!(outlet.pop(), Some(2));
        assert!(!outlet.finish(&mut observers));
        assert!(matches!(outlet.take_failure(), Some(Error::Source("boom"))));
        assert!(!outlet.has_errors());

        assert!(outlet.finish(&mut observers));
        assert_eq!(*seen.borrow(), vec![Event::Close]);
    }

    #[test]
    fn errors_are_queued() {
        let mut outlet: Outlet<u8, &str> = Outlet::new(16, Completion::MODERN);
        outlet.fail(Error::Source("a"));
        outlet.fail(Error::MunchAfterDestroy);
        assert!(matches!(outlet.take_error(), Some(Error::Source("a"))));
        assert!(matches!(outlet.take_error(), Some(Error::MunchAfterDestroy)));
        assert!(outlet.take_error().is_none());
    }
}
